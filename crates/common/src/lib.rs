pub mod types;
pub mod utils;
pub mod env;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn message_serializes_as_message_field() {
        let m = types::Message::new("done");
        assert_eq!(serde_json::to_value(&m).unwrap(), serde_json::json!({"message": "done"}));
    }
}
