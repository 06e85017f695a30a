//! Naming rules shared by ingestion and the emitters.
//!
//! | Input | Function | Output |
//! |-------|----------|--------|
//! | `getUser_Request` | [`first_upper`] | `GetUser_Request` |
//! | `com.example.user` | [`module_name`] | `com_example_user` |
//! | `com_example_user` | [`to_pascal_case`] | `ComExampleUser` |

/// Uppercase the first character and leave the rest untouched.
///
/// # Examples
///
/// ```
/// use grpcbridge_core::naming::first_upper;
///
/// assert_eq!(first_upper("point"), "Point");
/// assert_eq!(first_upper("id_Request"), "Id_Request");
/// assert_eq!(first_upper(""), "");
/// ```
pub fn first_upper(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Module name for a source namespace: dots become underscores.
///
/// # Examples
///
/// ```
/// use grpcbridge_core::naming::module_name;
///
/// assert_eq!(module_name("com.example.user"), "com_example_user");
/// assert_eq!(module_name("shared"), "shared");
/// ```
pub fn module_name(namespace: &str) -> String {
    namespace.replace('.', "_")
}

/// Convert a string to PascalCase.
///
/// Handles snake_case, kebab-case, and already-capitalized input.
///
/// # Examples
///
/// ```
/// use grpcbridge_core::naming::to_pascal_case;
///
/// assert_eq!(to_pascal_case("com_example_user"), "ComExampleUser");
/// assert_eq!(to_pascal_case("common"), "Common");
/// ```
pub fn to_pascal_case(s: &str) -> String {
    s.split(['-', '_']).map(first_upper).collect()
}

/// Split a qualified `ns.Name` identity into its namespace and simple name.
pub fn split_identity(identity: &str) -> (&str, &str) {
    match identity.rsplit_once('.') {
        Some((namespace, name)) => (namespace, name),
        None => ("", identity),
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn first_upper___keeps_remaining_case() {
        assert_eq!(first_upper("userId"), "UserId");
        assert_eq!(first_upper("ALREADY"), "ALREADY");
    }

    #[test]
    fn module_name___no_namespace___unchanged() {
        assert_eq!(module_name(""), "");
    }

    #[test]
    fn to_pascal_case___mixed_separators___joins_words() {
        assert_eq!(to_pascal_case("my-plugin_name"), "MyPluginName");
        assert_eq!(to_pascal_case(""), "");
    }

    #[test]
    fn split_identity___qualified___splits_on_last_dot() {
        assert_eq!(split_identity("com.example.User"), ("com.example", "User"));
    }

    #[test]
    fn split_identity___bare_name___empty_namespace() {
        assert_eq!(split_identity("User"), ("", "User"));
    }
}
