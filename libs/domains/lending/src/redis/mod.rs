//! Redis-backed adapters.
//!
//! | Concern     | Redis shape                                         |
//! |-------------|-----------------------------------------------------|
//! | Items       | hash `lending:items`, field = item id, value = JSON |
//! | List cache  | plain key written with `SET EX`                     |
//! | Events      | stream appended with `XADD MAXLEN ~`                |

mod cache;
mod events;
mod repository;

pub use cache::RedisCache;
pub use events::RedisStreamEventSink;
pub use repository::{ITEMS_HASH_KEY, RedisItemRepository};
