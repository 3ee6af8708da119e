use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use gabinete_auth::Role;
use gabinete_core::{CaseId, DomainError, JoinRequestId, OrgId, TagId, UserId, VoterId};
use gabinete_orgs::{
    AcceptCheck, Case, Decision, Invitation, InviteToken, JoinCode, JoinRequest, JoinRequestStatus,
    Membership, Organization, Tag, TagPatch, Voter, VoterPatch, ensure_admin_remains,
};

use super::{
    AuditEntry, AuditFilter, AuditStore, CaseStore, Credentials, InvitationStore, JoinRequestStore,
    JoinRequestView, MemberView, MembershipStore, MyMembership, NewUser, OrganizationStore, Page,
    PageRequest, Profile, ProfileStore, Stats, StoreError, StoreResult, TagStore, VoterQuery,
    VoterStore,
};

#[derive(Debug, Clone)]
struct ProfileRecord {
    profile: Profile,
    password_hash: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    orgs: HashMap<OrgId, Organization>,
    memberships: HashMap<(OrgId, UserId), Membership>,
    invitations: HashMap<String, Invitation>,
    join_requests: HashMap<JoinRequestId, JoinRequest>,
    audit: Vec<AuditEntry>,
    profiles: HashMap<UserId, ProfileRecord>,
    cases: HashMap<CaseId, Case>,
    voters: HashMap<VoterId, Voter>,
    tags: HashMap<TagId, Tag>,
    voter_tags: HashSet<(VoterId, TagId)>,
}

impl State {
    fn admin_count(&self, org_id: OrgId) -> usize {
        self.memberships
            .values()
            .filter(|m| m.org_id == org_id && m.role.is_admin())
            .count()
    }

    fn role_of(&self, org_id: OrgId, user_id: UserId) -> Option<Role> {
        self.memberships.get(&(org_id, user_id)).map(|m| m.role)
    }

    fn upsert_guarded(
        &mut self,
        org_id: OrgId,
        user_id: UserId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<Option<Role>, DomainError> {
        let current = self.role_of(org_id, user_id);
        ensure_admin_remains(current, Some(role), self.admin_count(org_id))?;
        match self.memberships.get_mut(&(org_id, user_id)) {
            Some(m) => m.role = role,
            None => {
                self.memberships
                    .insert((org_id, user_id), Membership::new(org_id, user_id, role, now));
            }
        }
        Ok(current)
    }

    fn email_holder(&self, email: &str) -> Option<UserId> {
        self.profiles
            .values()
            .find(|r| r.profile.email.as_deref() == Some(email))
            .map(|r| r.profile.user_id)
    }

    fn voter_in(&self, org_id: OrgId, voter_id: VoterId) -> Option<&Voter> {
        self.voters.get(&voter_id).filter(|v| v.org_id == org_id)
    }

    fn tag_in(&self, org_id: OrgId, tag_id: TagId) -> Option<&Tag> {
        self.tags.get(&tag_id).filter(|t| t.org_id == org_id)
    }
}

/// In-memory store for dev and tests.
///
/// All state sits behind one lock, so every trait method is atomic with
/// respect to every other.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Storage("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Storage("in-memory store lock poisoned".to_string()))
    }
}

fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait::async_trait]
impl OrganizationStore for InMemoryStore {
    async fn create_org_with_admin(&self, org: &Organization, admin: UserId) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.orgs.values().any(|o| o.join_code == org.join_code) {
            return Err(StoreError::Conflict("join code already in use".to_string()));
        }
        state.orgs.insert(org.id, org.clone());
        state.memberships.insert(
            (org.id, admin),
            Membership::new(org.id, admin, Role::Admin, org.created_at),
        );
        Ok(())
    }

    async fn get_org(&self, org_id: OrgId) -> StoreResult<Option<Organization>> {
        Ok(self.read()?.orgs.get(&org_id).cloned())
    }

    async fn find_org_by_code(&self, code: &JoinCode) -> StoreResult<Option<Organization>> {
        Ok(self
            .read()?
            .orgs
            .values()
            .find(|o| &o.join_code == code)
            .cloned())
    }

    async fn set_join_code(&self, org_id: OrgId, code: &JoinCode) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.orgs.values().any(|o| o.id != org_id && &o.join_code == code) {
            return Err(StoreError::Conflict("join code already in use".to_string()));
        }
        let org = state
            .orgs
            .get_mut(&org_id)
            .ok_or(DomainError::not_found("organization"))?;
        org.join_code = code.clone();
        Ok(())
    }

    async fn list_orgs(&self) -> StoreResult<Vec<Organization>> {
        let mut orgs: Vec<_> = self.read()?.orgs.values().cloned().collect();
        newest_first(&mut orgs, |o| (o.created_at, o.id));
        Ok(orgs)
    }

    async fn delete_org_cascade(&self, org_id: OrgId) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.orgs.contains_key(&org_id) {
            return Err(DomainError::not_found("organization").into());
        }
        let voters: HashSet<VoterId> = state
            .voters
            .values()
            .filter(|v| v.org_id == org_id)
            .map(|v| v.id)
            .collect();
        state.voter_tags.retain(|(v, _)| !voters.contains(v));
        state.voters.retain(|_, v| v.org_id != org_id);
        state.tags.retain(|_, t| t.org_id != org_id);
        state.cases.retain(|_, c| c.org_id != org_id);
        state.join_requests.retain(|_, r| r.org_id != org_id);
        state.invitations.retain(|_, i| i.org_id != org_id);
        state.memberships.retain(|(o, _), _| *o != org_id);
        state.orgs.remove(&org_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl MembershipStore for InMemoryStore {
    async fn role_of(&self, org_id: OrgId, user_id: UserId) -> StoreResult<Option<Role>> {
        Ok(self.read()?.role_of(org_id, user_id))
    }

    async fn list_members(&self, org_id: OrgId) -> StoreResult<Vec<MemberView>> {
        let state = self.read()?;
        let mut members: Vec<MemberView> = state
            .memberships
            .values()
            .filter(|m| m.org_id == org_id)
            .map(|m| {
                let profile = state.profiles.get(&m.user_id).map(|p| &p.profile);
                MemberView {
                    user_id: m.user_id,
                    email: profile.and_then(|p| p.email.clone()),
                    name: profile.and_then(|p| p.name.clone()),
                    role: m.role,
                    created_at: m.created_at,
                }
            })
            .collect();
        newest_first(&mut members, |m| (m.created_at, m.user_id));
        Ok(members)
    }

    async fn memberships_of(&self, user_id: UserId) -> StoreResult<Vec<MyMembership>> {
        let state = self.read()?;
        let mut mine: Vec<MyMembership> = state
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| {
                state.orgs.get(&m.org_id).map(|org| MyMembership {
                    org: org.clone(),
                    role: m.role,
                })
            })
            .collect();
        newest_first(&mut mine, |m| (m.org.created_at, m.org.id));
        Ok(mine)
    }

    async fn set_role_guarded(
        &self,
        org_id: OrgId,
        user_id: UserId,
        role: Role,
    ) -> StoreResult<Option<Role>> {
        Ok(self.write()?.upsert_guarded(org_id, user_id, role, Utc::now())?)
    }

    async fn remove_member_guarded(&self, org_id: OrgId, user_id: UserId) -> StoreResult<bool> {
        let mut state = self.write()?;
        let Some(current) = state.role_of(org_id, user_id) else {
            return Ok(false);
        };
        ensure_admin_remains(Some(current), None, state.admin_count(org_id))?;
        state.memberships.remove(&(org_id, user_id));
        Ok(true)
    }
}

#[async_trait::async_trait]
impl InvitationStore for InMemoryStore {
    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()> {
        let mut state = self.write()?;
        let key = invitation.token.as_str().to_string();
        if state.invitations.contains_key(&key) {
            return Err(StoreError::Conflict("invitation token already in use".to_string()));
        }
        state.invitations.insert(key, invitation.clone());
        Ok(())
    }

    async fn list_invitations(&self, org_id: OrgId) -> StoreResult<Vec<Invitation>> {
        let mut invites: Vec<_> = self
            .read()?
            .invitations
            .values()
            .filter(|i| i.org_id == org_id)
            .cloned()
            .collect();
        newest_first(&mut invites, |i| i.created_at);
        Ok(invites)
    }

    async fn delete_invitation(&self, token: &InviteToken, org_id: OrgId) -> StoreResult<bool> {
        let mut state = self.write()?;
        let matches = state
            .invitations
            .get(token.as_str())
            .is_some_and(|i| i.org_id == org_id);
        if matches {
            state.invitations.remove(token.as_str());
        }
        Ok(matches)
    }

    async fn accept_invitation(
        &self,
        token: &InviteToken,
        user_id: UserId,
        check: AcceptCheck<'_>,
    ) -> StoreResult<Invitation> {
        let mut state = self.write()?;
        let invitation = state
            .invitations
            .get(token.as_str())
            .cloned()
            .ok_or(DomainError::not_found("invitation"))?;
        invitation.check_acceptable(check)?;
        state.upsert_guarded(invitation.org_id, user_id, invitation.role, check.now)?;
        state.invitations.remove(token.as_str());
        Ok(invitation)
    }
}

#[async_trait::async_trait]
impl JoinRequestStore for InMemoryStore {
    async fn submit_join_request(&self, request: &JoinRequest) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.role_of(request.org_id, request.requester).is_some() {
            return Err(DomainError::AlreadyMember.into());
        }
        let duplicate = state.join_requests.values().any(|r| {
            r.org_id == request.org_id && r.requester == request.requester && r.is_pending()
        });
        if duplicate {
            return Err(DomainError::DuplicatePending.into());
        }
        state.join_requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get_join_request(&self, id: JoinRequestId) -> StoreResult<Option<JoinRequest>> {
        Ok(self.read()?.join_requests.get(&id).cloned())
    }

    async fn decide_join_request(
        &self,
        id: JoinRequestId,
        decision: Decision,
        by: UserId,
        now: DateTime<Utc>,
    ) -> StoreResult<JoinRequest> {
        let mut state = self.write()?;
        let mut request = state
            .join_requests
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("join request"))?;
        request.decide(decision, by, now)?;

        if decision == Decision::Approved && state.role_of(request.org_id, request.requester).is_none() {
            state.memberships.insert(
                (request.org_id, request.requester),
                Membership::new(request.org_id, request.requester, Role::Viewer, now),
            );
        }
        state.join_requests.insert(id, request.clone());
        Ok(request)
    }

    async fn list_join_requests(
        &self,
        org_id: OrgId,
        status: Option<JoinRequestStatus>,
    ) -> StoreResult<Vec<JoinRequest>> {
        let mut requests: Vec<_> = self
            .read()?
            .join_requests
            .values()
            .filter(|r| r.org_id == org_id && status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        requests.sort_by_key(|r| (r.created_at, r.id));
        Ok(requests)
    }

    async fn join_requests_of(&self, user_id: UserId) -> StoreResult<Vec<JoinRequestView>> {
        let state = self.read()?;
        let mut mine: Vec<JoinRequestView> = state
            .join_requests
            .values()
            .filter(|r| r.requester == user_id)
            .map(|r| JoinRequestView {
                request: r.clone(),
                org_name: state
                    .orgs
                    .get(&r.org_id)
                    .map(|o| o.name.clone())
                    .unwrap_or_default(),
            })
            .collect();
        newest_first(&mut mine, |v| (v.request.created_at, v.request.id));
        Ok(mine)
    }
}

#[async_trait::async_trait]
impl AuditStore for InMemoryStore {
    async fn append_audit(&self, entry: &AuditEntry) -> StoreResult<()> {
        self.write()?.audit.push(entry.clone());
        Ok(())
    }

    async fn query_audit(&self, filter: &AuditFilter, page: PageRequest) -> StoreResult<Page<AuditEntry>> {
        let state = self.read()?;
        let mut matching: Vec<&AuditEntry> = state.audit.iter().filter(|e| filter.matches(e)).collect();
        newest_first(&mut matching, |e| (e.created_at, e.id));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .cloned()
            .collect();
        Ok(Page {
            items,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryStore {
    async fn ensure_profile(&self, user_id: UserId, email: Option<&str>) -> StoreResult<Profile> {
        let mut state = self.write()?;
        let email = email.filter(|e| state.email_holder(e).is_none_or(|holder| holder == user_id));
        let record = state.profiles.entry(user_id).or_insert_with(|| ProfileRecord {
            profile: Profile {
                user_id,
                email: None,
                name: None,
                is_super_admin: false,
                created_at: Utc::now(),
            },
            password_hash: None,
        });
        if record.profile.email.is_none() {
            record.profile.email = email.map(str::to_string);
        }
        Ok(record.profile.clone())
    }

    async fn get_profile(&self, user_id: UserId) -> StoreResult<Option<Profile>> {
        Ok(self.read()?.profiles.get(&user_id).map(|r| r.profile.clone()))
    }

    async fn is_super_admin(&self, user_id: UserId) -> StoreResult<bool> {
        Ok(self
            .read()?
            .profiles
            .get(&user_id)
            .is_some_and(|r| r.profile.is_super_admin))
    }

    async fn set_super_admin(&self, user_id: UserId, flag: bool) -> StoreResult<()> {
        let mut state = self.write()?;
        let record = state.profiles.entry(user_id).or_insert_with(|| ProfileRecord {
            profile: Profile {
                user_id,
                email: None,
                name: None,
                is_super_admin: false,
                created_at: Utc::now(),
            },
            password_hash: None,
        });
        record.profile.is_super_admin = flag;
        Ok(())
    }

    async fn create_user_with_membership(
        &self,
        user: &NewUser,
        org_id: OrgId,
        role: Role,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.email_holder(&user.email).is_some() || state.profiles.contains_key(&user.user_id) {
            return Err(DomainError::EmailTaken.into());
        }
        if !state.orgs.contains_key(&org_id) {
            return Err(DomainError::not_found("organization").into());
        }
        state.upsert_guarded(org_id, user.user_id, role, now)?;
        state.profiles.insert(
            user.user_id,
            ProfileRecord {
                profile: Profile {
                    user_id: user.user_id,
                    email: Some(user.email.clone()),
                    name: user.name.clone(),
                    is_super_admin: false,
                    created_at: now,
                },
                password_hash: Some(user.password_hash.clone()),
            },
        );
        Ok(())
    }

    async fn find_credentials(&self, email: &str) -> StoreResult<Option<Credentials>> {
        Ok(self
            .read()?
            .profiles
            .values()
            .find(|r| r.profile.email.as_deref() == Some(email))
            .map(|r| Credentials {
                user_id: r.profile.user_id,
                password_hash: r.password_hash.clone(),
            }))
    }

    async fn set_password_hash(&self, user_id: UserId, hash: &str) -> StoreResult<()> {
        let mut state = self.write()?;
        let record = state
            .profiles
            .get_mut(&user_id)
            .ok_or(DomainError::not_found("user"))?;
        record.password_hash = Some(hash.to_string());
        Ok(())
    }

    async fn delete_account(&self, user_id: UserId) -> StoreResult<()> {
        let mut state = self.write()?;
        let admin_of: Vec<OrgId> = state
            .memberships
            .values()
            .filter(|m| m.user_id == user_id && m.role.is_admin())
            .map(|m| m.org_id)
            .collect();
        for org_id in admin_of {
            ensure_admin_remains(Some(Role::Admin), None, state.admin_count(org_id))?;
        }
        state.memberships.retain(|(_, u), _| *u != user_id);
        state.join_requests.retain(|_, r| r.requester != user_id);
        state.profiles.remove(&user_id);
        Ok(())
    }

    async fn stats(&self) -> StoreResult<Stats> {
        let state = self.read()?;
        Ok(Stats {
            organizations: state.orgs.len() as u64,
            profiles: state.profiles.len() as u64,
            memberships: state.memberships.len() as u64,
            cases: state.cases.len() as u64,
            voters: state.voters.len() as u64,
        })
    }
}

#[async_trait::async_trait]
impl CaseStore for InMemoryStore {
    async fn insert_case(&self, case: &Case) -> StoreResult<()> {
        self.write()?.cases.insert(case.id, case.clone());
        Ok(())
    }

    async fn list_cases(&self, org_id: OrgId) -> StoreResult<Vec<Case>> {
        let mut cases: Vec<_> = self
            .read()?
            .cases
            .values()
            .filter(|c| c.org_id == org_id)
            .cloned()
            .collect();
        newest_first(&mut cases, |c| (c.created_at, c.id));
        Ok(cases)
    }
}

#[async_trait::async_trait]
impl VoterStore for InMemoryStore {
    async fn insert_voter(&self, voter: &Voter) -> StoreResult<()> {
        self.write()?.voters.insert(voter.id, voter.clone());
        Ok(())
    }

    async fn get_voter(&self, org_id: OrgId, voter_id: VoterId) -> StoreResult<Option<Voter>> {
        Ok(self.read()?.voter_in(org_id, voter_id).cloned())
    }

    async fn list_voters(
        &self,
        org_id: OrgId,
        query: &VoterQuery,
        page: PageRequest,
    ) -> StoreResult<Page<Voter>> {
        let state = self.read()?;
        let mut matching: Vec<&Voter> = state
            .voters
            .values()
            .filter(|v| v.org_id == org_id)
            .filter(|v| query.q.as_deref().is_none_or(|q| v.matches(q)))
            .filter(|v| query.tag_id.is_none_or(|t| state.voter_tags.contains(&(v.id, t))))
            .collect();
        newest_first(&mut matching, |v| (v.created_at, v.id));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .cloned()
            .collect();
        Ok(Page {
            items,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn update_voter(&self, org_id: OrgId, voter_id: VoterId, patch: VoterPatch) -> StoreResult<Voter> {
        let mut state = self.write()?;
        let voter = state
            .voters
            .get_mut(&voter_id)
            .filter(|v| v.org_id == org_id)
            .ok_or(DomainError::not_found("voter"))?;
        voter.apply(patch)?;
        Ok(voter.clone())
    }

    async fn delete_voter(&self, org_id: OrgId, voter_id: VoterId) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.voter_in(org_id, voter_id).is_none() {
            return Ok(false);
        }
        state.voter_tags.retain(|(v, _)| *v != voter_id);
        state.voters.remove(&voter_id);
        Ok(true)
    }
}

#[async_trait::async_trait]
impl TagStore for InMemoryStore {
    async fn insert_tag(&self, tag: &Tag) -> StoreResult<()> {
        self.write()?.tags.insert(tag.id, tag.clone());
        Ok(())
    }

    async fn list_tags(&self, org_id: OrgId) -> StoreResult<Vec<Tag>> {
        let mut tags: Vec<_> = self
            .read()?
            .tags
            .values()
            .filter(|t| t.org_id == org_id)
            .cloned()
            .collect();
        newest_first(&mut tags, |t| (t.created_at, t.id));
        Ok(tags)
    }

    async fn update_tag(&self, org_id: OrgId, tag_id: TagId, patch: TagPatch) -> StoreResult<Tag> {
        let mut state = self.write()?;
        let tag = state
            .tags
            .get_mut(&tag_id)
            .filter(|t| t.org_id == org_id)
            .ok_or(DomainError::not_found("tag"))?;
        tag.apply(patch)?;
        Ok(tag.clone())
    }

    async fn delete_tag(&self, org_id: OrgId, tag_id: TagId) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.tag_in(org_id, tag_id).is_none() {
            return Ok(false);
        }
        state.voter_tags.retain(|(_, t)| *t != tag_id);
        state.tags.remove(&tag_id);
        Ok(true)
    }

    async fn tag_voter(&self, org_id: OrgId, voter_id: VoterId, tag_id: TagId) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.voter_in(org_id, voter_id).is_none() {
            return Err(DomainError::not_found("voter").into());
        }
        if state.tag_in(org_id, tag_id).is_none() {
            return Err(DomainError::not_found("tag").into());
        }
        state.voter_tags.insert((voter_id, tag_id));
        Ok(())
    }

    async fn untag_voter(&self, org_id: OrgId, voter_id: VoterId, tag_id: TagId) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.voter_in(org_id, voter_id).is_none() {
            return Ok(false);
        }
        Ok(state.voter_tags.remove(&(voter_id, tag_id)))
    }

    async fn tags_of_voter(&self, org_id: OrgId, voter_id: VoterId) -> StoreResult<Vec<Tag>> {
        let state = self.read()?;
        if state.voter_in(org_id, voter_id).is_none() {
            return Err(DomainError::not_found("voter").into());
        }
        let mut tags: Vec<Tag> = state
            .voter_tags
            .iter()
            .filter(|(v, _)| *v == voter_id)
            .filter_map(|(_, t)| state.tags.get(t).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gabinete_orgs::NewOrganization;

    fn org() -> Organization {
        Organization::create(
            NewOrganization {
                name: "Gabinete".into(),
                office: "senador".into(),
                state: Some("SP".into()),
                city: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_makes_creator_the_admin() {
        let store = InMemoryStore::new();
        let org = org();
        let creator = UserId::new();
        store.create_org_with_admin(&org, creator).await.unwrap();

        assert_eq!(store.role_of(org.id, creator).await.unwrap(), Some(Role::Admin));
        assert_eq!(
            store.find_org_by_code(&org.join_code).await.unwrap().map(|o| o.id),
            Some(org.id)
        );
    }

    #[tokio::test]
    async fn duplicate_join_code_is_a_conflict() {
        let store = InMemoryStore::new();
        let first = org();
        let mut second = org();
        second.join_code = first.join_code.clone();
        store.create_org_with_admin(&first, UserId::new()).await.unwrap();

        let err = store.create_org_with_admin(&second, UserId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.get_org(second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn removing_absent_member_is_not_an_error() {
        let store = InMemoryStore::new();
        let org = org();
        store.create_org_with_admin(&org, UserId::new()).await.unwrap();

        let ghost = UserId::new();
        assert!(!store.remove_member_guarded(org.id, ghost).await.unwrap());
        assert!(!store.remove_member_guarded(org.id, ghost).await.unwrap());
    }

    #[tokio::test]
    async fn cascade_removes_dependents() {
        let store = InMemoryStore::new();
        let org = org();
        let admin = UserId::new();
        store.create_org_with_admin(&org, admin).await.unwrap();
        let case = Case::open(
            org.id,
            gabinete_orgs::NewCase {
                title: "Poda de árvore".into(),
                description: None,
                due_at: None,
            },
            admin,
            Utc::now(),
        )
        .unwrap();
        store.insert_case(&case).await.unwrap();

        store.delete_org_cascade(org.id).await.unwrap();
        assert!(store.get_org(org.id).await.unwrap().is_none());
        assert!(store.list_cases(org.id).await.unwrap().is_empty());
        assert_eq!(store.role_of(org.id, admin).await.unwrap(), None);

        let err = store.delete_org_cascade(org.id).await.unwrap_err();
        assert_eq!(err, StoreError::Rejected(DomainError::not_found("organization")));
    }

    fn voter(org_id: OrgId, name: &str) -> Voter {
        Voter::register(
            org_id,
            gabinete_orgs::NewVoter {
                name: name.into(),
                phone: "53 3222-0000".into(),
                city: "Pelotas".into(),
                ..Default::default()
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn voter_tags_are_org_scoped_and_cascade() {
        let store = InMemoryStore::new();
        let (org, other) = (org(), org());
        store.create_org_with_admin(&org, UserId::new()).await.unwrap();
        store.create_org_with_admin(&other, UserId::new()).await.unwrap();

        let ana = voter(org.id, "Ana");
        store.insert_voter(&ana).await.unwrap();
        let tag = |org_id, name: &str| {
            let input = gabinete_orgs::NewTag {
                name: name.into(),
                color: None,
            };
            Tag::create(org_id, input, Utc::now()).unwrap()
        };
        let (tag, foreign) = (tag(org.id, "Saúde"), tag(other.id, "Obras"));
        store.insert_tag(&tag).await.unwrap();
        store.insert_tag(&foreign).await.unwrap();

        store.tag_voter(org.id, ana.id, tag.id).await.unwrap();
        store.tag_voter(org.id, ana.id, tag.id).await.unwrap();
        let err = store.tag_voter(org.id, ana.id, foreign.id).await.unwrap_err();
        assert_eq!(err, StoreError::Rejected(DomainError::not_found("tag")));
        assert_eq!(store.tags_of_voter(org.id, ana.id).await.unwrap(), vec![tag.clone()]);
        assert!(store.get_voter(other.id, ana.id).await.unwrap().is_none());

        store.delete_org_cascade(org.id).await.unwrap();
        let state = store.read().unwrap();
        assert!(state.voters.is_empty());
        assert!(state.voter_tags.is_empty());
        assert_eq!(state.tags.keys().collect::<Vec<_>>(), vec![&foreign.id]);
    }

    #[tokio::test]
    async fn ensure_profile_skips_an_email_held_by_another_user() {
        let store = InMemoryStore::new();
        let org = org();
        store.create_org_with_admin(&org, UserId::new()).await.unwrap();
        let created = NewUser {
            user_id: UserId::new(),
            email: "ana@example.org".into(),
            name: None,
            password_hash: "x".into(),
        };
        store
            .create_user_with_membership(&created, org.id, Role::Viewer, Utc::now())
            .await
            .unwrap();

        let other = UserId::new();
        let profile = store.ensure_profile(other, Some("ana@example.org")).await.unwrap();
        assert_eq!(profile.email, None);
        let creds = store.find_credentials("ana@example.org").await.unwrap().unwrap();
        assert_eq!(creds.user_id, created.user_id);
    }
}
