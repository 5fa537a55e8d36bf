//! `MiRecord`: one parsed line of GDB/MI output.

use super::value::MiTuple;

/// The three GDB/MI result classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultClass {
    Done,
    Running,
    Connected,
    Error,
    Exit,
}

impl ResultClass {
    pub(super) fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "done" => ResultClass::Done,
            "running" => ResultClass::Running,
            "connected" => ResultClass::Connected,
            "error" => ResultClass::Error,
            "exit" => ResultClass::Exit,
            _ => return None,
        })
    }
}

/// The three GDB/MI async record classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AsyncClass {
    Exec,
    Status,
    Notify,
}

/// The three GDB/MI stream record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Console,
    Target,
    Log,
}

/// One fully parsed line from GDB's `--interpreter=mi3` stdout.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum MiRecord {
    /// `(gdb)` record terminator. Carries no data; callers use it to know
    /// a logical record has ended.
    Terminator,
    /// `[token]^class[,results]`
    Result {
        token: Option<u64>,
        class: ResultClass,
        fields: MiTuple,
    },
    /// `[token]*class,...` / `+class,...` / `=class,...`
    Async {
        token: Option<u64>,
        class: AsyncClass,
        name: String,
        fields: MiTuple,
    },
    /// `~"..."` / `@"..."` / `&"..."`
    Stream { kind: StreamKind, text: String },
}

impl MiRecord {
    pub fn token(&self) -> Option<u64> {
        match self {
            MiRecord::Result { token, .. } | MiRecord::Async { token, .. } => *token,
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&MiTuple> {
        match self {
            MiRecord::Result { fields, .. } | MiRecord::Async { fields, .. } => Some(fields),
            _ => None,
        }
    }
}
