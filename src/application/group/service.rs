//! Groups, membership and the bounded member counter.
//!
//! Every membership change moves the counter and the rows in the same
//! transaction. The counter update carries its own bound check, so
//! concurrent admitters can never push a group past `max_members`.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::cache::MembershipCache;
use crate::application::repair::schedule;
use crate::domain::group::{Group, GroupMember, GroupUpdate, MemberStatus, NewGroup};
use crate::domain::id::{GroupId, UserId};
use crate::error::{Error, Result};
use crate::port::outbound::queue::{RepairJob, RepairQueue};
use crate::port::outbound::store::{Database, Repository};

/// Optional metadata supplied when creating a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMetadata {
    pub description: String,
    pub avatar: String,
    /// Falls back to the configured default.
    pub max_members: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupDetails {
    pub group: Group,
    /// Empty unless members were requested.
    pub members: Vec<GroupMember>,
}

/// Result of removing members or deleting a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemberRemoval {
    pub removed: usize,
    /// At least one cache eviction failed and was queued for repair.
    pub repair_pending: bool,
}

pub struct GroupService<D> {
    db: Arc<D>,
    cache: MembershipCache,
    queue: Arc<dyn RepairQueue>,
    default_max_members: i32,
}

impl<D: Database> GroupService<D> {
    pub fn new(
        db: Arc<D>,
        cache: MembershipCache,
        queue: Arc<dyn RepairQueue>,
        default_max_members: i32,
    ) -> Self {
        Self {
            db,
            cache,
            queue,
            default_max_members,
        }
    }

    /// Create a group owned by `owner` with `initial_members` admitted.
    ///
    /// The owner always takes a seat. Duplicate IDs are ignored.
    pub async fn create_group(
        &self,
        owner: UserId,
        name: &str,
        metadata: GroupMetadata,
        initial_members: &[UserId],
    ) -> Result<GroupDetails> {
        let new_group = NewGroup::try_new(
            owner,
            name,
            metadata.max_members.unwrap_or(self.default_max_members),
        )?
        .with_description(metadata.description)
        .with_avatar(metadata.avatar);

        let mut seats = vec![owner];
        seats.extend(dedup(initial_members).into_iter().filter(|u| *u != owner));
        let requested = seat_count(seats.len())?;

        let details = self.db.transaction(|repo| {
            let mut group = repo.create_group(&new_group)?;
            if !repo.increment_member_count(group.id, requested)? {
                return Err(Error::CapacityExceeded {
                    group: group.id,
                    requested,
                    available: group.max_members,
                });
            }
            group.member_count = requested;

            let members: Vec<GroupMember> = seats
                .iter()
                .map(|&user| {
                    if user == owner {
                        GroupMember::owner(group.id, user)
                    } else {
                        GroupMember::member(group.id, user)
                    }
                })
                .collect();
            repo.insert_members(&members)?;
            Ok(GroupDetails { group, members })
        })?;

        info!(
            group = %details.group.id,
            %owner,
            members = details.group.member_count,
            "Group created"
        );
        Ok(details)
    }

    /// Admit the candidates that are not members yet. Returns how many were
    /// admitted; zero when all of them already were.
    pub async fn add_members(
        &self,
        group_id: GroupId,
        requester: UserId,
        candidates: &[UserId],
    ) -> Result<usize> {
        let candidates = dedup(candidates);

        let admitted = self.db.transaction(|repo| {
            let group = require_group(repo, group_id)?;
            if repo.get_member(group_id, requester)?.is_none() {
                return Err(Error::Forbidden(format!(
                    "user {requester} is not a member of group {group_id}"
                )));
            }

            let existing: HashSet<UserId> =
                repo.existing_members(group_id, &candidates)?.into_iter().collect();
            let fresh: Vec<UserId> = candidates
                .iter()
                .copied()
                .filter(|u| !existing.contains(u))
                .collect();
            if fresh.is_empty() {
                return Ok(0);
            }

            let requested = seat_count(fresh.len())?;
            if requested > group.remaining_capacity() {
                return Err(capacity_exceeded(&group, requested));
            }
            if !repo.increment_member_count(group_id, requested)? {
                let available = repo
                    .get_group(group_id)?
                    .map_or(0, |g| g.remaining_capacity());
                return Err(Error::CapacityExceeded {
                    group: group_id,
                    requested,
                    available,
                });
            }

            let members: Vec<GroupMember> = fresh
                .iter()
                .map(|&user| GroupMember::member(group_id, user))
                .collect();
            repo.insert_members(&members)?;
            Ok(fresh.len())
        })?;

        if admitted > 0 {
            info!(group = %group_id, %requester, admitted, "Members added");
        } else {
            debug!(group = %group_id, "All candidates already members");
        }
        Ok(admitted)
    }

    /// Remove members. Only the owner may do this, and the owner cannot
    /// remove themselves.
    pub async fn remove_members(
        &self,
        group_id: GroupId,
        requester: UserId,
        candidates: &[UserId],
    ) -> Result<MemberRemoval> {
        let candidates = dedup(candidates);

        let removed = self.db.transaction(|repo| {
            let group = require_group(repo, group_id)?;
            require_owner(&group, requester)?;
            if candidates.contains(&group.owner) {
                return Err(Error::InvalidState(format!(
                    "the owner cannot be removed from group {group_id}"
                )));
            }

            let present = repo.existing_members(group_id, &candidates)?;
            if present.is_empty() {
                return Ok(present);
            }

            let delta = seat_count(present.len())?;
            if !repo.decrement_member_count(group_id, delta)? {
                return Err(Error::InvalidState(format!(
                    "group {group_id} member count is below {delta}"
                )));
            }
            repo.delete_members(group_id, &present)?;
            Ok(present)
        })?;

        if !removed.is_empty() {
            info!(group = %group_id, removed = removed.len(), "Members removed");
        }
        let repair_pending = self.evict_all(group_id, &removed).await;
        Ok(MemberRemoval {
            removed: removed.len(),
            repair_pending,
        })
    }

    /// Whether `user` belongs to `group_id`, reading the cache first.
    ///
    /// A store hit is written back, then re-read: a removal that committed
    /// and evicted while the write was in flight gets the entry evicted
    /// again here, or through the repair queue if that fails.
    pub async fn is_member(&self, group_id: GroupId, user: UserId) -> Result<bool> {
        match self.cache.member_status(group_id, user).await {
            Ok(Some(_)) => return Ok(true),
            Ok(None) => {}
            Err(e) => warn!(group = %group_id, %user, error = %e, "Membership cache read failed, using store"),
        }

        let Some(member) = self.db.run(|repo| repo.get_member(group_id, user))? else {
            return Ok(false);
        };
        if let Err(e) = self.populate_verified(group_id, user, member.status).await {
            let job = RepairJob::EvictMember {
                group: group_id,
                user,
            };
            schedule(self.queue.as_ref(), job, &e).await;
        }
        Ok(true)
    }

    async fn populate_verified(&self, group_id: GroupId, user: UserId, status: MemberStatus) -> Result<()> {
        self.cache.set_member(group_id, user, status).await?;
        if self.db.run(|repo| repo.get_member(group_id, user))?.is_none() {
            debug!(group = %group_id, %user, "Member removed during cache write, evicting");
            self.cache.evict(group_id, user).await?;
        }
        Ok(())
    }

    pub async fn get_group(&self, group_id: GroupId, with_members: bool) -> Result<GroupDetails> {
        self.db.run(|repo| {
            let group = require_group(repo, group_id)?;
            let members = if with_members {
                repo.list_members(group_id)?
            } else {
                Vec::new()
            };
            Ok(GroupDetails { group, members })
        })
    }

    /// Groups `user` belongs to.
    pub async fn list_groups(&self, user: UserId) -> Result<Vec<Group>> {
        self.db.run(|repo| {
            let ids: Vec<GroupId> = repo
                .list_memberships(user)?
                .into_iter()
                .map(|m| m.group)
                .collect();
            repo.list_groups(&ids)
        })
    }

    /// Change name, description or avatar. Owner only.
    pub async fn update_group(
        &self,
        group_id: GroupId,
        requester: UserId,
        update: &GroupUpdate,
    ) -> Result<Group> {
        self.db.transaction(|repo| {
            let mut group = require_group(repo, group_id)?;
            require_owner(&group, requester)?;
            if update.apply(&mut group) {
                repo.update_group(&group)?;
                info!(group = %group_id, "Group updated");
            }
            Ok(group)
        })
    }

    /// Delete the group and every membership. Owner only.
    pub async fn delete_group(&self, group_id: GroupId, requester: UserId) -> Result<MemberRemoval> {
        let removed = self.db.transaction(|repo| {
            let group = require_group(repo, group_id)?;
            require_owner(&group, requester)?;
            let members: Vec<UserId> = repo
                .list_members(group_id)?
                .into_iter()
                .map(|m| m.user)
                .collect();
            repo.delete_all_members(group_id)?;
            repo.delete_group(group_id)?;
            Ok(members)
        })?;
        info!(group = %group_id, members = removed.len(), "Group deleted");

        let repair_pending = self.evict_all(group_id, &removed).await;
        Ok(MemberRemoval {
            removed: removed.len(),
            repair_pending,
        })
    }

    async fn evict_all(&self, group_id: GroupId, users: &[UserId]) -> bool {
        let mut repair_pending = false;
        for &user in users {
            if let Err(e) = self.cache.evict(group_id, user).await {
                let job = RepairJob::EvictMember {
                    group: group_id,
                    user,
                };
                schedule(self.queue.as_ref(), job, &e).await;
                repair_pending = true;
            }
        }
        repair_pending
    }
}

fn require_group(repo: &mut dyn Repository, id: GroupId) -> Result<Group> {
    repo.get_group(id)?
        .ok_or_else(|| Error::not_found(format_args!("group {id}")))
}

fn require_owner(group: &Group, requester: UserId) -> Result<()> {
    if group.is_owned_by(requester) {
        Ok(())
    } else {
        Err(Error::Forbidden(format!(
            "user {requester} does not own group {}",
            group.id
        )))
    }
}

fn capacity_exceeded(group: &Group, requested: i32) -> Error {
    Error::CapacityExceeded {
        group: group.id,
        requested,
        available: group.remaining_capacity(),
    }
}

fn seat_count(n: usize) -> Result<i32> {
    i32::try_from(n).map_err(|_| Error::InvalidState(format!("too many members in one call: {n}")))
}

/// Drop repeated IDs, keeping first-seen order.
fn dedup(users: &[UserId]) -> Vec<UserId> {
    let mut seen = HashSet::with_capacity(users.len());
    users.iter().copied().filter(|u| seen.insert(*u)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::adapter::outbound::sqlite::SqliteDatabase;
    use crate::error::ErrorKind;
    use crate::testkit::cache::FlakyCache;
    use crate::testkit::db::TempDb;
    use crate::testkit::queue::RecordingQueue;

    struct Fixture {
        _db: TempDb,
        cache: Arc<FlakyCache>,
        queue: Arc<RecordingQueue>,
        service: GroupService<SqliteDatabase>,
    }

    fn fixture() -> Fixture {
        let db = TempDb::new();
        let cache = Arc::new(FlakyCache::new());
        let queue = Arc::new(RecordingQueue::new());
        let service = GroupService::new(
            Arc::new(db.database()),
            MembershipCache::new(cache.clone(), Duration::from_secs(1)),
            queue.clone(),
            500,
        );
        Fixture {
            _db: db,
            cache,
            queue,
            service,
        }
    }

    fn uid(n: i64) -> UserId {
        UserId::new(n)
    }

    fn capped(max: i32) -> GroupMetadata {
        GroupMetadata {
            max_members: Some(max),
            ..GroupMetadata::default()
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        assert_eq!(dedup(&[uid(3), uid(1), uid(3), uid(2), uid(1)]), vec![uid(3), uid(1), uid(2)]);
    }

    #[tokio::test]
    async fn create_counts_owner_and_initial_members() {
        let f = fixture();
        let details = f
            .service
            .create_group(uid(1), "hikers", GroupMetadata::default(), &[uid(2), uid(1), uid(2)])
            .await
            .unwrap();

        assert_eq!(details.group.member_count, 2);
        assert_eq!(details.group.max_members, 500);
        assert_eq!(details.members.len(), 2);
    }

    #[tokio::test]
    async fn create_beyond_capacity_writes_nothing() {
        let f = fixture();
        let err = f
            .service
            .create_group(uid(1), "tiny", capped(2), &[uid(2), uid(3)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert!(f.service.list_groups(uid(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_is_idempotent_for_existing_members() {
        let f = fixture();
        let group = f
            .service
            .create_group(uid(1), "g", GroupMetadata::default(), &[uid(2)])
            .await
            .unwrap()
            .group;

        assert_eq!(f.service.add_members(group.id, uid(1), &[uid(2), uid(3)]).await.unwrap(), 1);
        assert_eq!(f.service.add_members(group.id, uid(1), &[uid(2), uid(3)]).await.unwrap(), 0);

        let details = f.service.get_group(group.id, true).await.unwrap();
        assert_eq!(details.group.member_count, 3);
        assert_eq!(details.members.len(), 3);
    }

    #[tokio::test]
    async fn non_members_cannot_add() {
        let f = fixture();
        let group = f
            .service
            .create_group(uid(1), "g", GroupMetadata::default(), &[])
            .await
            .unwrap()
            .group;

        let err = f.service.add_members(group.id, uid(9), &[uid(3)]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn remove_is_owner_only_and_spares_owner() {
        let f = fixture();
        let group = f
            .service
            .create_group(uid(1), "g", GroupMetadata::default(), &[uid(2), uid(3)])
            .await
            .unwrap()
            .group;

        let err = f.service.remove_members(group.id, uid(2), &[uid(3)]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = f.service.remove_members(group.id, uid(1), &[uid(1)]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let removal = f
            .service
            .remove_members(group.id, uid(1), &[uid(3), uid(7)])
            .await
            .unwrap();
        assert_eq!(removal.removed, 1);
        assert_eq!(f.service.get_group(group.id, false).await.unwrap().group.member_count, 2);
    }

    #[tokio::test]
    async fn membership_check_populates_and_removal_evicts() {
        let f = fixture();
        let group = f
            .service
            .create_group(uid(1), "g", GroupMetadata::default(), &[uid(2)])
            .await
            .unwrap()
            .group;
        let bucket = MembershipCache::bucket(group.id);

        assert!(f.service.is_member(group.id, uid(2)).await.unwrap());
        assert_eq!(f.cache.inner().bucket_len(&bucket), 1);

        f.service.remove_members(group.id, uid(1), &[uid(2)]).await.unwrap();
        assert_eq!(f.cache.inner().bucket_len(&bucket), 0);
        assert!(!f.service.is_member(group.id, uid(2)).await.unwrap());
    }

    #[tokio::test]
    async fn failed_eviction_is_queued() {
        let f = fixture();
        let group = f
            .service
            .create_group(uid(1), "g", GroupMetadata::default(), &[uid(2)])
            .await
            .unwrap()
            .group;
        f.cache.set_failing(true);

        let removal = f.service.remove_members(group.id, uid(1), &[uid(2)]).await.unwrap();

        assert!(removal.repair_pending);
        assert_eq!(
            f.queue.jobs(),
            vec![RepairJob::EvictMember {
                group: group.id,
                user: uid(2)
            }]
        );
    }

    #[tokio::test]
    async fn update_and_delete_require_owner() {
        let f = fixture();
        let group = f
            .service
            .create_group(uid(1), "old", GroupMetadata::default(), &[uid(2)])
            .await
            .unwrap()
            .group;
        let update = GroupUpdate {
            name: Some("new".into()),
            ..GroupUpdate::default()
        };

        let err = f.service.update_group(group.id, uid(2), &update).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let updated = f.service.update_group(group.id, uid(1), &update).await.unwrap();
        assert_eq!(updated.name, "new");

        let err = f.service.delete_group(group.id, uid(2)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let removal = f.service.delete_group(group.id, uid(1)).await.unwrap();
        assert_eq!(removal.removed, 2);

        let err = f.service.get_group(group.id, false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
