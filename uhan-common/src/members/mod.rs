//! DAO member registry
//!
//! Members live as one JSON array under the `daoMembers` storage key. The
//! whole list is held in memory and written back after every change.

mod pagination;

pub use pagination::{calculate_pagination, Pagination, PAGE_SIZE};

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::events::{EventBus, FormEvent, MemberAction};
use crate::form::Attachment;
use crate::ids;
use crate::qr::{encode_or_placeholder, QrPayload, QrRenderer, QrSlot, QrStyle};
use crate::storage::{keys, LoadOutcome, RecordStore};
use crate::time;
use crate::validation::ValidationReport;

/// Base of the verification link encoded in member QR codes
pub const VERIFY_BASE_URL: &str = "https://verify.ulp.daovillage.org";

pub const MIN_VOTING_POWER: i64 = 1;
pub const MAX_VOTING_POWER: i64 = 1000;

fn ulp_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^ULP-[A-Z]{3}-[A-Z]+-\d{5}$").ok())
        .as_ref()
}

/// True for ids shaped like `ULP-IND-ASSAM-00094`
pub fn is_valid_ulp_id(id: &str) -> bool {
    ulp_id_pattern().is_some_and(|re| re.is_match(id))
}

pub fn verification_url(ulp_id: &str) -> String {
    format!("{}/{}", VERIFY_BASE_URL, ulp_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemberRole {
    Citizen,
    CouncilMember,
    Delegate,
    Guardian,
    Treasurer,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberRole::Citizen => "citizen",
            MemberRole::CouncilMember => "council-member",
            MemberRole::Delegate => "delegate",
            MemberRole::Guardian => "guardian",
            MemberRole::Treasurer => "treasurer",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    Active,
    Pending,
    Inactive,
}

impl MemberStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Pending => "pending",
            MemberStatus::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub full_name: String,
    pub ulp_id: String,
    #[serde(default)]
    pub wallet_address: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: MemberRole,
    pub village_cluster: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub join_date: NaiveDate,
    pub voting_power: u32,
    pub status: MemberStatus,
    #[serde(default)]
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Member fields as submitted by the form; every field optional so the
/// same shape serves add (all required ones present) and update (merge)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInput {
    pub full_name: Option<String>,
    pub ulp_id: Option<String>,
    pub wallet_address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<MemberRole>,
    pub village_cluster: Option<String>,
    pub address: Option<String>,
    pub join_date: Option<NaiveDate>,
    pub voting_power: Option<i64>,
    pub status: Option<MemberStatus>,
    pub photo: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl MemberInput {
    /// Field errors for a complete member
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();

        for (field, value) in [
            ("fullName", &self.full_name),
            ("ulpId", &self.ulp_id),
            ("email", &self.email),
            ("villageCluster", &self.village_cluster),
        ] {
            if non_blank(value).is_none() {
                report.push(field, format!("{} is required", field));
            }
        }
        if self.role.is_none() {
            report.push("role", "role is required");
        }
        if self.join_date.is_none() {
            report.push("joinDate", "joinDate is required");
        }

        if let Some(ulp_id) = non_blank(&self.ulp_id) {
            if !is_valid_ulp_id(ulp_id) {
                report.push("ulpId", "ULP ID format should be: ULP-REGION-STATE-XXXXX");
            }
        }

        match self.voting_power {
            Some(power) if (MIN_VOTING_POWER..=MAX_VOTING_POWER).contains(&power) => {}
            _ => report.push(
                "votingPower",
                format!(
                    "Voting power must be between {} and {}",
                    MIN_VOTING_POWER, MAX_VOTING_POWER
                ),
            ),
        }

        if let Some(photo) = non_blank(&self.photo) {
            if let Err(e) = Attachment::parse(photo) {
                report.push("photo", e.to_string());
            }
        }

        report
    }

    /// Overwrite fields of `self` with the ones present in `other`
    fn merge(mut self, other: MemberInput) -> Self {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            full_name, ulp_id, wallet_address, email, phone, role, village_cluster, address,
            join_date, voting_power, status, photo
        );
        self
    }

    /// Build a member from a validated input
    fn into_member(self, id: String, created_at: DateTime<Utc>) -> Result<Member, MemberError> {
        let report = self.validate();
        if !report.is_valid() {
            return Err(MemberError::Invalid(report));
        }
        let (Some(role), Some(join_date), Some(voting_power)) = (self.role, self.join_date, self.voting_power) else {
            return Err(MemberError::Invalid(report));
        };
        let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string()).unwrap_or_default();
        let optional = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        Ok(Member {
            id,
            full_name: trimmed(self.full_name),
            ulp_id: trimmed(self.ulp_id),
            wallet_address: trimmed(self.wallet_address),
            email: trimmed(self.email),
            phone: optional(self.phone),
            role,
            village_cluster: trimmed(self.village_cluster),
            address: optional(self.address),
            join_date,
            voting_power: voting_power as u32,
            status: self.status.unwrap_or_default(),
            photo: optional(self.photo),
            created_at,
        })
    }
}

impl From<&Member> for MemberInput {
    fn from(m: &Member) -> Self {
        Self {
            full_name: Some(m.full_name.clone()),
            ulp_id: Some(m.ulp_id.clone()),
            wallet_address: Some(m.wallet_address.clone()),
            email: Some(m.email.clone()),
            phone: m.phone.clone(),
            role: Some(m.role),
            village_cluster: Some(m.village_cluster.clone()),
            address: m.address.clone(),
            join_date: Some(m.join_date),
            voting_power: Some(i64::from(m.voting_power)),
            status: Some(m.status),
            photo: m.photo.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MemberError {
    #[error("Member not found: {0}")]
    NotFound(String),

    #[error("{}", .0.summary())]
    Invalid(ValidationReport),

    #[error(transparent)]
    Storage(#[from] crate::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    Id,
    Name,
    UlpId,
    Role,
    Village,
    JoinDate,
    VotingPower,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

fn compare(a: &Member, b: &Member, field: SortField) -> Ordering {
    match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Name => a.full_name.cmp(&b.full_name),
        SortField::UlpId => a.ulp_id.cmp(&b.ulp_id),
        SortField::Role => a.role.as_str().cmp(b.role.as_str()),
        SortField::Village => a.village_cluster.cmp(&b.village_cluster),
        SortField::JoinDate => a.join_date.cmp(&b.join_date),
        SortField::VotingPower => a.voting_power.cmp(&b.voting_power),
        SortField::Status => a.status.as_str().cmp(b.status.as_str()),
    }
}

/// Stable sort; members that compare equal keep their insertion order in
/// both directions
pub fn sort_members(members: &mut [Member], field: SortField, direction: SortDirection) {
    members.sort_by(|a, b| {
        let ord = compare(a, b, field);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListQuery {
    pub sort: SortField,
    pub direction: SortDirection,
    pub page: Option<usize>,
    /// Case-insensitive filter, see [`MemberRegistry::search`]
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPage {
    pub members: Vec<Member>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStats {
    pub total: usize,
    pub active: usize,
    pub pending: usize,
    /// Sum over active members only
    pub total_voting_power: u64,
}

fn matches(member: &Member, needle: &str) -> bool {
    [
        member.full_name.as_str(),
        member.ulp_id.as_str(),
        member.email.as_str(),
        member.village_cluster.as_str(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

fn generate_id() -> String {
    format!("DAO{}", ids::random_hex(10))
}

pub struct MemberRegistry {
    store: RecordStore,
    members: RwLock<Vec<Member>>,
    events: Option<EventBus>,
}

impl MemberRegistry {
    /// Read the member list from storage; an unreadable list starts empty
    pub async fn load(store: RecordStore, events: Option<EventBus>) -> crate::Result<Self> {
        let members = match store.get_json::<Vec<Member>>(keys::DAO_MEMBERS).await? {
            LoadOutcome::Found(list) => list,
            LoadOutcome::NotFound => Vec::new(),
            LoadOutcome::Corrupt { reason } => {
                warn!("Member list is unreadable, starting empty: {}", reason);
                Vec::new()
            }
        };
        info!("Loaded {} DAO members", members.len());
        Ok(Self {
            store,
            members: RwLock::new(members),
            events,
        })
    }

    fn emit(&self, member_id: &str, action: MemberAction) {
        if let Some(bus) = &self.events {
            bus.emit_lossy(FormEvent::MembersChanged {
                member_id: member_id.to_string(),
                action,
                timestamp: time::now(),
            });
        }
    }

    async fn persist(&self, members: &[Member]) -> crate::Result<()> {
        self.store.put_json(keys::DAO_MEMBERS, members).await
    }

    pub async fn add(&self, input: MemberInput) -> Result<Member, MemberError> {
        let input = MemberInput {
            status: Some(MemberStatus::Active),
            ..input
        };
        let member = input.into_member(generate_id(), time::now())?;

        let mut members = self.members.write().await;
        members.push(member.clone());
        if let Err(e) = self.persist(&members).await {
            members.pop();
            return Err(e.into());
        }
        drop(members);

        info!("Member added: {} ({})", member.full_name, member.id);
        self.emit(&member.id, MemberAction::Added);
        Ok(member)
    }

    /// Merge `input` into the member `id`
    pub async fn update(&self, id: &str, input: MemberInput) -> Result<Member, MemberError> {
        let mut members = self.members.write().await;
        let index = members
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| MemberError::NotFound(id.to_string()))?;

        let existing = members[index].clone();
        let updated = MemberInput::from(&existing)
            .merge(input)
            .into_member(existing.id.clone(), existing.created_at)?;

        members[index] = updated.clone();
        if let Err(e) = self.persist(&members).await {
            members[index] = existing;
            return Err(e.into());
        }
        drop(members);

        info!("Member updated: {} ({})", updated.full_name, updated.id);
        self.emit(&updated.id, MemberAction::Updated);
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<Member, MemberError> {
        let mut members = self.members.write().await;
        let index = members
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| MemberError::NotFound(id.to_string()))?;

        let removed = members.remove(index);
        if let Err(e) = self.persist(&members).await {
            members.insert(index, removed);
            return Err(e.into());
        }
        drop(members);

        info!("Member deleted: {} ({})", removed.full_name, removed.id);
        self.emit(&removed.id, MemberAction::Deleted);
        Ok(removed)
    }

    pub async fn get(&self, id: &str) -> Option<Member> {
        self.members.read().await.iter().find(|m| m.id == id).cloned()
    }

    /// Case-insensitive substring match over name, ULP id, email and village
    ///
    /// A blank query matches everyone.
    pub async fn search(&self, query: &str) -> Vec<Member> {
        let needle = query.trim().to_lowercase();
        self.members
            .read()
            .await
            .iter()
            .filter(|m| needle.is_empty() || matches(m, &needle))
            .cloned()
            .collect()
    }

    /// Filtered, sorted page of members
    pub async fn list(&self, query: &ListQuery) -> MemberPage {
        let mut members = match &query.q {
            Some(q) => self.search(q).await,
            None => self.members.read().await.clone(),
        };
        sort_members(&mut members, query.sort, query.direction);

        let total = members.len();
        let p = calculate_pagination(total, query.page.unwrap_or(1), PAGE_SIZE);
        let members = members.into_iter().skip(p.offset).take(PAGE_SIZE).collect();

        MemberPage {
            members,
            page: p.page,
            total_pages: p.total_pages,
            total,
            page_size: PAGE_SIZE,
        }
    }

    pub async fn stats(&self) -> MemberStats {
        let members = self.members.read().await;
        let active: Vec<&Member> = members
            .iter()
            .filter(|m| m.status == MemberStatus::Active)
            .collect();
        MemberStats {
            total: members.len(),
            active: active.len(),
            pending: members
                .iter()
                .filter(|m| m.status == MemberStatus::Pending)
                .count(),
            total_voting_power: active.iter().map(|m| u64::from(m.voting_power)).sum(),
        }
    }

    /// QR code with the member's verification link
    pub async fn qr(&self, id: &str, renderer: &dyn QrRenderer) -> Result<QrSlot, MemberError> {
        let member = self
            .get(id)
            .await
            .ok_or_else(|| MemberError::NotFound(id.to_string()))?;
        let payload = QrPayload::Text(verification_url(&member.ulp_id));
        Ok(encode_or_placeholder(renderer, &payload, &QrStyle::default()))
    }

    pub async fn len(&self) -> usize {
        self.members.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.members.read().await.is_empty()
    }
}
