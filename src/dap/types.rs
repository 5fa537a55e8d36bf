//! Argument/response bodies for the custom DAP requests named in spec
//! §6. The bulk of the DAP protocol (`launch`, `setBreakpoints`,
//! `stackTrace`, …) is produced by the embedding application's own
//! transport layer; this crate only needs shapes for the extensions
//! unique to it.
//!
//! Grounded on `dap_server/debug_adapter/dap/dap_types.rs`'s
//! hand-written argument structs (`RttWindowOpenedArguments`,
//! `ShowMessageEventBody`, …) — that file also pulls in the standard
//! DAP vocabulary via `schemafy!` against a vendored
//! `debugProtocol.json`, a generation step this crate has no use for
//! since it never speaks DAP wire format directly.

use serde::{Deserialize, Serialize};

/// `execute-command {command}` → `{miOutput}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandArguments {
    pub command: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandResponseBody {
    pub mi_output: String,
}

/// `reset-device {}` → void.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetDeviceArguments {}

/// `set-var-format {hex: bool}` → void.
#[derive(Debug, Clone, Deserialize)]
pub struct SetVarFormatArguments {
    pub hex: bool,
}

/// `load-function-symbols {}` → `{file: path}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadFunctionSymbolsArguments {}

#[derive(Debug, Clone, Serialize)]
pub struct LoadFunctionSymbolsResponseBody {
    pub file: String,
}

/// Display-format hint shared by the `*Live` requests, mirroring DAP's
/// `ValueFormat`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValueFormat {
    #[serde(default)]
    pub hex: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadMemoryLiveArguments {
    pub memory_reference: String,
    #[serde(default)]
    pub offset: i64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadMemoryLiveResponseBody {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unreadable_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteMemoryLiveArguments {
    pub memory_reference: String,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub allow_partial: bool,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteMemoryLiveResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_written: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateLiveArguments {
    pub expression: String,
    pub frame_id: Option<i64>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub format: Option<ValueFormat>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateLiveResponseBody {
    pub result: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub variables_reference: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_variables: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_variables: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesLiveArguments {
    pub variables_reference: i64,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub format: Option<ValueFormat>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DapVariable {
    pub name: String,
    pub value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluate_name: Option<String>,
    pub variables_reference: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_variables: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_variables: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariablesLiveResponseBody {
    pub variables: Vec<DapVariable>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableLiveArguments {
    pub variables_reference: i64,
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub format: Option<ValueFormat>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableLiveResponseBody {
    pub value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables_reference: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_variables: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_variables: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetExpressionLiveArguments {
    pub expression: String,
    pub value: String,
    pub frame_id: Option<i64>,
    #[serde(default)]
    pub format: Option<ValueFormat>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetExpressionLiveResponseBody {
    pub value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables_reference: Option<i64>,
}

/// `deleteLiveGdbVariables {}` → void.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteLiveGdbVariablesArguments {}

/// `registerClient {}`: the client declares itself ready to receive RTT
/// data on the channels it has opened windows for.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterClientArguments {
    pub channel_numbers: Vec<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RttChannelStatus {
    pub channel_number: u32,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RttPollArguments {}

#[derive(Debug, Clone, Serialize)]
pub struct RttPollResponseBody {
    pub channels: Vec<RttChannelStatus>,
}

/// `swo-connected {}` → void: the client reports that it has attached
/// a listener to the SWO decoder's advertised port.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SwoConnectedArguments {}

/// `custom-stop-debugging {}` → void.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomStopDebuggingArguments {}

/// `notified-children-to-terminate {}` → void.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifiedChildrenToTerminateArguments {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_command_arguments_parse_camel_case() {
        let json = r#"{"command": "monitor reset"}"#;
        let args: ExecuteCommandArguments = serde_json::from_str(json).unwrap();
        assert_eq!(args.command, "monitor reset");
    }

    #[test]
    fn evaluate_live_response_omits_absent_optional_fields() {
        let body = EvaluateLiveResponseBody {
            result: "42".to_string(),
            type_name: None,
            variables_reference: 0,
            named_variables: None,
            indexed_variables: None,
            memory_reference: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("type"));
        assert!(!json.contains("memoryReference"));
    }
}
