//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods.
//! Read paths take `&PgPool`; methods that participate in the pipeline's
//! transactions take `impl PgExecutor<'_>` so they run against either a
//! pool or an open transaction.

pub mod comment_repo;
pub mod notification_repo;
pub mod request_item_repo;
pub mod request_repo;
pub mod request_view_cache_repo;
pub mod role_assignment_repo;
pub mod role_repo;
pub mod rule_repo;
pub mod state_history_repo;
pub mod subscription_repo;
pub mod trigger_history_repo;

pub use comment_repo::CommentRepo;
pub use notification_repo::NotificationRepo;
pub use request_item_repo::RequestItemRepo;
pub use request_repo::RequestRepo;
pub use request_view_cache_repo::RequestViewCacheRepo;
pub use role_assignment_repo::RoleAssignmentRepo;
pub use role_repo::RoleRepo;
pub use rule_repo::RuleRepo;
pub use state_history_repo::StateHistoryRepo;
pub use subscription_repo::SubscriptionRepo;
pub use trigger_history_repo::TriggerHistoryRepo;
