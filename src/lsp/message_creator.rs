use lsp_types::ClientCapabilities;
use serde::Serialize;

use crate::lsp::types::{Notification, Request};

/// Hands out request envelopes with monotonically increasing ids, starting
/// at 1. The first request of a session is always id 1.
pub struct MessageFactory {
    id: i32,
}

impl MessageFactory {
    pub fn new() -> Self {
        MessageFactory { id: 0 }
    }

    fn next_id(&mut self) -> i32 {
        self.id += 1;
        self.id
    }

    pub fn create_request<T: Serialize>(
        &mut self,
        method: &str,
        params: T,
    ) -> Result<Request, serde_json::Error> {
        Ok(Request::new(
            self.next_id(),
            method.to_string(),
            serde_json::to_value(params)?,
        ))
    }

    pub fn create_notification<T: Serialize>(
        &mut self,
        method: &str,
        params: T,
    ) -> Result<Notification, serde_json::Error> {
        Ok(Notification::new(
            method.to_string(),
            serde_json::to_value(params)?,
        ))
    }
}

/// Params for the `initialize` request: the reported process id, the
/// workspace root, and an empty capability set.
pub fn initialize_params(process_id: u32, root_path: &str) -> serde_json::Value {
    serde_json::json!({
        "processId": process_id,
        "rootPath": root_path,
        "capabilities": ClientCapabilities::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_ids_start_at_one_and_increment() {
        let mut factory = MessageFactory::new();
        let first = factory
            .create_request("initialize", serde_json::json!({}))
            .unwrap();
        let second = factory
            .create_request("shutdown", serde_json::json!({}))
            .unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[test]
    fn initialize_params_carry_exactly_the_configured_keys() {
        let params = initialize_params(12345, "/tmp");
        let object = params.as_object().unwrap();

        let mut keys: Vec<_> = object.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["capabilities", "processId", "rootPath"]);

        assert_eq!(object["processId"], 12345);
        assert_eq!(object["rootPath"], "/tmp");
        // an empty ClientCapabilities serializes to an empty mapping
        assert_eq!(object["capabilities"], serde_json::json!({}));
    }

    #[test]
    fn notifications_carry_no_id() {
        let mut factory = MessageFactory::new();
        let exit = factory
            .create_notification("exit", serde_json::json!({}))
            .unwrap();
        let json = serde_json::to_value(&exit).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["method"], "exit");
    }
}
