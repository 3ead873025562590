use std::path::Path;

use mongo_cluster::{Notification, PeerIdentity};

use crate::Error;

/// The hook name from a dispatch path such as `hooks/cluster-relation-joined`.
pub fn hook_name(dispatch_path: &str) -> Result<&str, Error> {
    Path::new(dispatch_path)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::NoHookName(dispatch_path.to_string()))
}

/// Maps a hook to the notification it delivers. Hooks the cluster does not
/// react to map to `None`.
pub fn notification_for(
    hook: &str,
    relation: &str,
    remote_unit: Option<&str>,
) -> Result<Option<Notification>, Error> {
    let remote = remote_unit
        .filter(|unit| !unit.is_empty())
        .map(PeerIdentity::new);

    let Some(event) = hook
        .strip_prefix(relation)
        .and_then(|rest| rest.strip_prefix("-relation-"))
    else {
        return Ok(match hook {
            "start" => Some(Notification::Start),
            "config-changed" => Some(Notification::ConfigChanged),
            "upgrade-charm" => Some(Notification::Upgrade),
            _ => None,
        });
    };

    Ok(match (event, remote) {
        ("joined", Some(peer)) => Some(Notification::PeerJoined(peer)),
        ("changed", Some(peer)) => Some(Notification::PeerUpdated(peer)),
        ("changed", None) => Some(Notification::ClusterUpdated),
        ("departed", Some(peer)) => Some(Notification::PeerDeparted(peer)),
        ("joined" | "departed", None) => return Err(Error::MissingRemoteUnit(hook.to_string())),
        _ => None,
    })
}
