use serde::{Deserialize, Serialize};

/// JSON-RPC 2.0 notification for one-way delivery to the host UI.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InteractionNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

impl InteractionNotification {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Outbox of notifications produced while handling input.
/// Hosts drain it once per frame and forward to their UI layer.
#[derive(Debug, Default)]
pub struct InteractionNotifications {
    outgoing: Vec<InteractionNotification>,
}

impl InteractionNotifications {
    pub fn send_notification(&mut self, method: &str, params: serde_json::Value) {
        self.outgoing.push(InteractionNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
    }

    pub fn pending(&self) -> &[InteractionNotification] {
        &self.outgoing
    }

    pub fn drain(&mut self) -> Vec<InteractionNotification> {
        std::mem::take(&mut self.outgoing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_outbox_in_order() {
        let mut outbox = InteractionNotifications::default();
        outbox.send_notification("measure_started", serde_json::json!({ "position": [0.0, 0.0, 0.0] }));
        outbox.send_notification("measure_completed", serde_json::json!({ "distance": 5.0 }));

        let sent = outbox.drain();
        assert!(outbox.pending().is_empty());
        let methods: Vec<&str> = sent.iter().map(|n| n.method.as_str()).collect();
        assert_eq!(methods, vec!["measure_started", "measure_completed"]);

        let json = sent[1].to_json().expect("serialise");
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"distance\":5.0"));
    }
}
