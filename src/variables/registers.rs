//! Register group expansion and the `$xpsr`/`$control` bitfield decoder
//! (spec §4.5 "Registers", "`$xpsr` / `$control` decoding").

/// One row of `maint print register-groups`.
#[derive(Debug, Clone)]
pub struct RegisterRow {
    pub name: String,
    pub number: u32,
    pub groups: Vec<String>,
}

/// Parse `maint print reggroups` console output, returning the
/// non-internal group names (e.g. skipping "all", "save", "restore"
/// whose type is `internal`).
pub fn parse_reggroups(console_text: &str) -> Vec<String> {
    console_text
        .lines()
        .skip(1) // header row
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let name = cols.next()?;
            let kind = cols.next()?;
            (kind != "internal").then(|| name.to_string())
        })
        .collect()
}

/// Parse `maint print register-groups` console output into one row per
/// register.
pub fn parse_register_groups(console_text: &str) -> Vec<RegisterRow> {
    console_text
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let name = cols.next()?.to_string();
            let number: u32 = cols.next()?.parse().ok()?;
            // Remaining columns up to (but not including) the trailing
            // group list vary by gdb version; the group list is always
            // the last whitespace-separated field and is comma-joined
            // in some gdb builds, space-separated in others.
            let rest: Vec<&str> = cols.collect();
            let groups = rest
                .last()
                .map(|s| s.split(',').map(str::to_string).collect())
                .unwrap_or_default();
            Some(RegisterRow { name, number, groups })
        })
        .collect()
}

/// Registers belonging only to internal groups surface under this
/// synthetic group name.
pub const MISC_GROUP: &str = "Misc";

/// Extract `width` bits from `value` starting at bit `offset` (LSB-first).
pub fn extract_bits(value: u32, offset: u32, width: u32) -> u32 {
    if width == 0 || width >= 32 {
        return value >> offset;
    }
    (value >> offset) & ((1u32 << width) - 1)
}

/// Multi-line bitfield description for `$xpsr`.
pub fn decode_xpsr(value: u32) -> String {
    let n = extract_bits(value, 31, 1);
    let z = extract_bits(value, 30, 1);
    let c = extract_bits(value, 29, 1);
    let v = extract_bits(value, 28, 1);
    let q = extract_bits(value, 27, 1);
    let ge = extract_bits(value, 16, 4);
    let exception = extract_bits(value, 0, 9);
    let ici_it = (extract_bits(value, 25, 2) << 6) | extract_bits(value, 10, 6);
    let t = extract_bits(value, 24, 1);
    format!(
        "xPSR = {value:#010x}\n N = {n}\n Z = {z}\n C = {c}\n V = {v}\n Q = {q}\n GE[16:4] = {ge:#06b}\n ICI/IT = {ici_it:#08b}\n T = {t}\n Exception number = {exception}"
    )
}

/// Multi-line bitfield description for `$control`.
pub fn decode_control(value: u32) -> String {
    let npriv = extract_bits(value, 0, 1);
    let spsel = extract_bits(value, 1, 1);
    let fpca = extract_bits(value, 2, 1);
    format!(
        "CONTROL = {value:#010x}\n nPRIV = {npriv}\n SPSEL = {spsel}\n FPCA = {fpca}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bits_basic() {
        assert_eq!(extract_bits(0b1011_0000, 4, 4), 0b1011);
        assert_eq!(extract_bits(0xFFFF_FFFF, 31, 1), 1);
        assert_eq!(extract_bits(0, 31, 1), 0);
    }

    #[test]
    fn reggroups_skip_internal() {
        let text = " Group      Type\n general    user\n all        internal\n save       internal\n float      user\n";
        let groups = parse_reggroups(text);
        assert_eq!(groups, vec!["general".to_string(), "float".to_string()]);
    }

    #[test]
    fn xpsr_decode_contains_flags() {
        let out = decode_xpsr(0x8100_0003);
        assert!(out.contains("N = 1"));
        assert!(out.contains("Exception number = 3"));
    }
}
