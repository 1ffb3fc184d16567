//! Well-known role names and role-assignment scopes.
//!
//! Role names must match the seed data in
//! `20260301000001_create_roles_tables.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_TEACHER: &str = "teacher";
pub const ROLE_COURSE_COORDINATOR: &str = "course_coordinator";

/// Role assignment bound to one course.
pub const SCOPE_COURSE: &str = "course";

/// Role assignment bound to a course category.
pub const SCOPE_CATEGORY: &str = "category";

/// Site-wide role assignment (no instance).
pub const SCOPE_SITE: &str = "site";

/// All valid assignment scopes. Scopes do not nest: a user assigned at
/// category level is not implicitly assigned in that category's courses.
pub const VALID_SCOPES: &[&str] = &[SCOPE_COURSE, SCOPE_CATEGORY, SCOPE_SITE];
