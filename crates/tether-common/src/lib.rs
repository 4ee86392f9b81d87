pub mod api;
pub mod errors;
pub mod events;
pub mod id;

pub use api::{ApiMethod, ApiRequest};
pub use errors::{BridgeError, ConfigError, TetherError};
pub use events::{BridgeEvent, EventBus, PushAction, PushEvent};
pub use id::{new_session_id, QueryId, QueryIdGenerator, SessionId};

pub type Result<T> = std::result::Result<T, TetherError>;
