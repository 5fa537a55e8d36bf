//! Child `evaluateName` construction (spec §4.5).

/// `true` if `type_name` denotes a pointer type (naive textual check: a
/// trailing `*`, ignoring trailing whitespace/qualifiers).
pub fn type_is_pointer(type_name: &str) -> bool {
    type_name.trim_end().ends_with('*')
}

fn needs_parens(expr: &str) -> bool {
    expr.chars()
        .any(|c| !(c.is_ascii_alphanumeric() || "_[].->".contains(c)))
}

fn collapse(expr: &str) -> String {
    let collapsed = expr.replace("*&", "");
    collapsed.replace("..", ".")
}

/// Build the evaluate-name expression for a child named `child_name` of a
/// parent whose own evaluate-name is `parent_expr` and whose static type
/// is `parent_type`.
pub fn child_eval_name(parent_expr: &str, parent_type: &str, child_name: &str) -> String {
    let is_index = !child_name.is_empty() && child_name.chars().all(|c| c.is_ascii_digit());
    let starts_with_bracket = child_name.starts_with('[');

    let parent = if needs_parens(parent_expr) {
        format!("({parent_expr})")
    } else {
        parent_expr.to_string()
    };

    let joined = if is_index {
        format!("{parent}[{child_name}]")
    } else if starts_with_bracket {
        format!("{parent}{child_name}")
    } else if type_is_pointer(parent_type) {
        format!("{parent}->{child_name}")
    } else {
        format!("{parent}.{child_name}")
    };

    collapse(&joined)
}

/// Names that denote transparent wrapper nodes (anonymous unions/structs,
/// or C++ access-specifier groupings) whose children should be merged
/// into the parent's child list instead of nested (spec §4.5 "Listing
/// children").
pub fn is_transparent_wrapper(name: &str) -> bool {
    name.starts_with("<anonymous ") || matches!(name, "public" | "private" | "protected")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_index_child() {
        assert_eq!(child_eval_name("arr", "int [4]", "0"), "arr[0]");
    }

    #[test]
    fn bracket_prefixed_child() {
        assert_eq!(child_eval_name("arr", "int [4]", "[1]"), "arr[1]");
    }

    #[test]
    fn pointer_parent_uses_arrow() {
        assert_eq!(child_eval_name("p", "struct foo *", "field"), "p->field");
    }

    #[test]
    fn value_parent_uses_dot() {
        assert_eq!(child_eval_name("s", "struct foo", "field"), "s.field");
    }

    #[test]
    fn non_identifier_parent_gets_parens() {
        assert_eq!(child_eval_name("*p", "struct foo", "field"), "(*p).field");
        assert_eq!(child_eval_name("&s", "struct foo", "field"), "(&s).field");
    }

    #[test]
    fn collapses_deref_address_and_double_dot() {
        // (*&s).field -> the *& collapses to empty before re-parenthesizing
        // is evaluated on the raw joined string.
        assert_eq!(collapse("*&s.field"), "s.field");
        assert_eq!(collapse("s..field"), "s.field");
    }

    #[test]
    fn transparent_wrapper_names() {
        assert!(is_transparent_wrapper("<anonymous union>"));
        assert!(is_transparent_wrapper("public"));
        assert!(!is_transparent_wrapper("member"));
    }
}
