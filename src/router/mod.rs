//! Topic routing
//!
//! Maps topics to the subscribers whose filters match them. Filters are exact
//! paths or a path prefix followed by the `#` wildcard:
//!
//! ```text
//!   filter            drone/position   drone/battery   drone   rover/position
//!   drone/position         yes              no           no          no
//!   drone/#                yes              yes          yes         no
//!   #                      yes              yes          yes         yes
//! ```

pub mod table;
pub mod topic;

pub use table::TopicRouter;
pub use topic::{Topic, TopicFilter};
