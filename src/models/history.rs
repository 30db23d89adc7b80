//! Audit entries exposed as a read-only resource

use crate::core::audit::HistoryEntry;
use crate::core::permission::{Operation, PermissionMap, Role};
use crate::server::resource::ResourceConfig;

/// Resource configuration of [`HistoryEntry`]
///
/// Only admins may read. No role can write through the HTTP surface; entries
/// are appended by the pipeline itself.
pub fn history_resource() -> ResourceConfig {
    ResourceConfig::new::<HistoryEntry>()
        .permissions(PermissionMap::new().grant(Role::admin(), [Operation::Read]))
        .skip_user_binding()
        .append_only()
}
