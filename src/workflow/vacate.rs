//! Forcing a bridge's ghost users out of a room.

use crate::client::{ClientFactory, JoinedMembers};
use crate::error::WorkflowError;
use crate::prefix::resolve_user_prefix;
use crate::registration::Registration;
use futures_util::{StreamExt, TryStreamExt, stream};
use tracing::info;

/// What to vacate.
#[derive(Debug, Clone, Default)]
pub struct VacateRequest {
    /// Room to empty of ghosts.
    pub room_id: String,
    /// Ghost user id prefix; derived from the registration when absent.
    pub user_prefix: Option<String>,
    /// Also make the bridge bot leave, after every ghost has.
    pub include_bot: bool,
}

/// Outcome of a completed vacate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VacateReport {
    pub room_id: String,
    /// Prefix ghosts were matched on.
    pub user_prefix: String,
    /// Users that left, in the order they were made to.
    pub departed: Vec<String>,
}

/// One leave in the plan. `None` is the bridge bot itself.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LeaveTask {
    user_id: Option<String>,
}

/// Joined members whose user id starts with `prefix`, in snapshot order.
pub fn bridged_members(snapshot: &JoinedMembers, prefix: &str) -> Vec<String> {
    snapshot
        .user_ids()
        .filter(|user_id| user_id.starts_with(prefix))
        .map(str::to_string)
        .collect()
}

/// Make every ghost in the room leave it, one at a time.
///
/// The prefix is resolved before the factory is touched, so an unusable
/// registration fails without any request. The first failed request aborts
/// the remaining leaves; leaves already done stay done.
pub async fn vacate_room(
    factory: &dyn ClientFactory,
    registration: &Registration,
    request: &VacateRequest,
) -> Result<VacateReport, WorkflowError> {
    let user_prefix = resolve_user_prefix(request.user_prefix.as_deref(), registration)?;
    let room_id = request.room_id.as_str();

    let bot = factory.client_as(None);

    info!("Finding bridged users in room...");
    let snapshot = bot.joined_members(room_id).await?;
    let ghosts = bridged_members(&snapshot, &user_prefix);
    info!("Found {} bridged users in room {}", ghosts.len(), room_id);

    let mut plan: Vec<LeaveTask> = ghosts
        .into_iter()
        .map(|user_id| LeaveTask {
            user_id: Some(user_id),
        })
        .collect();
    if request.include_bot {
        plan.push(LeaveTask { user_id: None });
    }

    let departed = stream::iter(plan)
        .map(Ok::<_, WorkflowError>)
        .try_fold(Vec::new(), |mut departed, task| async move {
            let client = factory.client_as(task.user_id.as_deref());
            info!("Forcing {} to leave {}", client.user_id(), room_id);
            client.leave(room_id).await?;
            departed.push(client.user_id().to_string());
            Ok(departed)
        })
        .await?;

    info!("Done!");
    Ok(VacateReport {
        room_id: room_id.to_string(),
        user_prefix,
        departed,
    })
}
