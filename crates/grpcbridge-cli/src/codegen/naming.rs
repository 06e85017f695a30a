//! Naming conventions of the generated Java.
//!
//! | Input | Function | Output |
//! |-------|----------|--------|
//! | proto field `user_id2x` | [`proto_accessor`] | `UserId2X` |
//! | thrift field `userId` | [`thrift_accessor`] | `UserId` |
//! | rpc `get_user` | [`grpc_method_name`] | `getUser` |
//! | module `com_example` | [`marshaller_class`] | `ComExampleGrpcMarshaller` |

use grpcbridge_core::naming::{first_upper, to_pascal_case};

/// Accessor stem protobuf-java derives from a field name.
///
/// Underscores are dropped; the first letter, letters after an underscore
/// and letters after a digit are upper-cased.
///
/// # Examples
///
/// ```
/// use grpcbridge_cli::codegen::naming::proto_accessor;
///
/// assert_eq!(proto_accessor("user_id"), "UserId");
/// assert_eq!(proto_accessor("v2beta"), "V2Beta");
/// assert_eq!(proto_accessor("data"), "Data");
/// ```
pub fn proto_accessor(field: &str) -> String {
    let mut result = String::with_capacity(field.len());
    let mut upper_next = true;

    for c in field.chars() {
        if c == '_' {
            upper_next = true;
            continue;
        }
        if upper_next {
            result.extend(c.to_uppercase());
        } else {
            result.push(c);
        }
        upper_next = c.is_ascii_digit();
    }

    result
}

/// Accessor stem of a thrift-generated Java field.
///
/// # Examples
///
/// ```
/// use grpcbridge_cli::codegen::naming::thrift_accessor;
///
/// assert_eq!(thrift_accessor("userId"), "UserId");
/// assert_eq!(thrift_accessor("user_id"), "User_id");
/// ```
pub fn thrift_accessor(field: &str) -> String {
    first_upper(field)
}

/// Server method name grpc-java generates for an RPC.
///
/// # Examples
///
/// ```
/// use grpcbridge_cli::codegen::naming::grpc_method_name;
///
/// assert_eq!(grpc_method_name("get_user"), "getUser");
/// assert_eq!(grpc_method_name("GetUser"), "getUser");
/// assert_eq!(grpc_method_name("ping"), "ping");
/// ```
pub fn grpc_method_name(rpc: &str) -> String {
    let mut chars = proto_accessor(rpc).chars().collect::<Vec<_>>();
    if let Some(first) = chars.first_mut() {
        *first = first.to_ascii_lowercase();
    }
    chars.into_iter().collect()
}

/// Codec class name for a module and direction label (`Grpc` or `Thrift`).
pub fn marshaller_class(module: &str, direction: &str) -> String {
    format!("{}{}Marshaller", to_pascal_case(module), direction)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use test_case::test_case;

    #[test_case("name", "Name")]
    #[test_case("user_name", "UserName")]
    #[test_case("field1", "Field1")]
    #[test_case("a1b2c", "A1B2C")]
    #[test_case("double__underscore", "DoubleUnderscore")]
    #[test_case("", "")]
    fn proto_accessor___converts(input: &str, expected: &str) {
        assert_eq!(proto_accessor(input), expected);
    }

    #[test_case("getUser", "getUser")]
    #[test_case("list_all_users", "listAllUsers")]
    #[test_case("Ping", "ping")]
    fn grpc_method_name___converts(input: &str, expected: &str) {
        assert_eq!(grpc_method_name(input), expected);
    }

    #[test]
    fn marshaller_class___snake_module___pascal_cased() {
        assert_eq!(marshaller_class("com_example_user", "Grpc"), "ComExampleUserGrpcMarshaller");
        assert_eq!(marshaller_class("common", "Thrift"), "CommonThriftMarshaller");
    }
}
