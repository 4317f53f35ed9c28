//! Single-use completion tokens.
//!
//! A member asks for a token once the order is at the drop-off point; the
//! same member later presents it to complete the order.

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::model::OrderId;
use crate::model::{Timestamp, UserId};

#[derive(Debug, Clone)]
struct IssuedToken {
    order_id: OrderId,
    user_id: UserId,
    expires_at: Timestamp,
}

pub struct TokenRegistry {
    ttl: Duration,
    tokens: Mutex<HashMap<String, IssuedToken>>,
}

impl TokenRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a token for `user` on `order_id`. Returns `None` if the registry is unavailable.
    pub fn issue(&self, order_id: OrderId, user_id: UserId) -> Option<String> {
        let token = format!("ctk_{}", Uuid::new_v4().simple());
        let now = Utc::now().timestamp_millis();
        let mut tokens = self.tokens.lock().ok()?;
        // drop anything already expired while we hold the lock
        tokens.retain(|_, t| t.expires_at > now);
        tokens.insert(
            token.clone(),
            IssuedToken {
                order_id,
                user_id,
                expires_at: now + self.ttl.num_milliseconds(),
            },
        );
        Some(token)
    }

    /// Whether `token` is live and was issued to `user_id` for `order_id`.
    pub fn verify(&self, order_id: OrderId, user_id: &UserId, token: &str) -> bool {
        let now = Utc::now().timestamp_millis();
        let Ok(tokens) = self.tokens.lock() else {
            return false;
        };
        tokens.get(token).is_some_and(|issued| {
            issued.order_id == order_id && &issued.user_id == user_id && issued.expires_at > now
        })
    }

    /// Invalidate a token after use.
    pub fn revoke(&self, token: &str) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.remove(token);
        }
    }
}
