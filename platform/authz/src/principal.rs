use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated identity attached to an inbound request.
///
/// Produced by the upstream authentication stage; the guard trusts it as-is.
/// Carries exactly one role. `org_id` scopes data access after authorization
/// passes and is not consulted by the policy decision itself.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: String,
    pub org_id: Uuid,
}
