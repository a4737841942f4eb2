//! Group management endpoints and their storage helpers.

pub mod groups;
pub mod members;
mod storage;
mod types;

pub use groups::{create_group, list_groups, patch_group};
pub use members::{add_member, list_members, remove_member};
pub use types::{
    AddMemberRequest, CreateGroupRequest, GroupResponse, MemberResponse, UpdateGroupRequest,
};

pub(super) const GROUP_NAME_MAX: usize = 128;
