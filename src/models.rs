//! Place records as stored in the `places` table.
//!
//! Enum variants serialize to the exact strings the table holds, so these
//! types can be handed straight to the REST layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $kind:literal {
            $($variant:ident => $wire:literal, $label:literal;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Value stored in the table column.
            pub fn wire(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.wire())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.wire() == s)
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

wire_enum! {
    Category as "category" {
        Restaurant => "식당", "Restaurant";
        Cafe => "카페", "Café";
        CultureLeisure => "문화/여가", "Culture & leisure";
        Landmark => "명소", "Landmark";
        PopupFestival => "팝업/축제", "Pop-up & festival";
    }
}

wire_enum! {
    VisitStatus as "visit status" {
        NotVisited => "미방문", "Not visited";
        Visited => "방문 완료", "Visited";
        Revisited => "재방문 완료", "Revisited";
    }
}

wire_enum! {
    Priority as "priority" {
        Top => "🔥 최우선", "Top priority";
        MustGo => "✨ 꼭 가볼 곳", "Must go";
        Normal => "일반", "Normal";
    }
}

wire_enum! {
    RecordStatus as "record status" {
        Draft => "draft", "Draft";
        Published => "published", "Published";
    }
}

wire_enum! {
    ParkingInfo as "parking info" {
        OnSite => "매장 주차장", "On-site lot";
        Assisted => "주차 지원", "Parking assisted";
        NearbyPaid => "인근 공영/유료", "Nearby public/paid";
        Unavailable => "주차 불가", "No parking";
    }
}

impl Default for VisitStatus {
    fn default() -> Self {
        VisitStatus::NotVisited
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl Default for RecordStatus {
    fn default() -> Self {
        RecordStatus::Draft
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub category: Category,
    pub visit_status: VisitStatus,
    pub priority: Priority,
    pub record_status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_main: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking_info: Option<ParkingInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking_memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePlaceInput {
    pub name: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_status: Option<VisitStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_status: Option<RecordStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_main: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking_info: Option<ParkingInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking_memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

/// Partial update. `None` means "leave as is"; a patch cannot clear a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePlaceInput {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_status: Option<VisitStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_status: Option<RecordStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_main: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking_info: Option<ParkingInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking_memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaceFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_status: Option<VisitStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_status: Option<RecordStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_main: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("place name must not be blank")]
    BlankName,
    #[error("start date {start} is after end date {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("patch for {patch} cannot be applied to place {place}")]
    IdMismatch { place: Uuid, patch: Uuid },
}

impl CreatePlaceInput {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            visit_status: None,
            priority: None,
            record_status: None,
            region_main: None,
            region_sub: None,
            address: None,
            operating_hours: None,
            parking_info: None,
            parking_memo: None,
            keywords: None,
            memo: None,
            source_url: None,
            cover_image_url: None,
            start_date: None,
            end_date: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName);
        }
        check_date_range(self.start_date, self.end_date)
    }
}

fn check_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => {
            Err(ValidationError::InvertedDateRange { start, end })
        }
        _ => Ok(()),
    }
}

impl UpdatePlaceInput {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            name: None,
            category: None,
            visit_status: None,
            priority: None,
            record_status: None,
            region_main: None,
            region_sub: None,
            address: None,
            operating_hours: None,
            parking_info: None,
            parking_memo: None,
            keywords: None,
            memo: None,
            source_url: None,
            cover_image_url: None,
            start_date: None,
            end_date: None,
        }
    }

    /// True when the patch carries nothing but the id.
    pub fn is_empty(&self) -> bool {
        *self == Self::new(self.id)
    }
}

fn patch_field<T: PartialEq + Clone>(slot: &mut T, value: &Option<T>) -> bool {
    match value {
        Some(v) if slot != v => {
            *slot = v.clone();
            true
        }
        _ => false,
    }
}

fn patch_optional<T: PartialEq + Clone>(slot: &mut Option<T>, value: &Option<T>) -> bool {
    match value {
        Some(v) if slot.as_ref() != Some(v) => {
            *slot = Some(v.clone());
            true
        }
        _ => false,
    }
}

impl Place {
    pub fn from_create(
        id: Uuid,
        user_id: Uuid,
        input: CreatePlaceInput,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            name: input.name,
            category: input.category,
            visit_status: input.visit_status.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            record_status: input.record_status.unwrap_or_default(),
            region_main: input.region_main,
            region_sub: input.region_sub,
            address: input.address,
            operating_hours: input.operating_hours,
            parking_info: input.parking_info,
            parking_memo: input.parking_memo,
            keywords: input.keywords,
            memo: input.memo,
            source_url: input.source_url,
            cover_image_url: input.cover_image_url,
            start_date: input.start_date,
            end_date: input.end_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a patch in place. Returns whether any field changed; `updated_at`
    /// moves only in that case.
    pub fn apply(&mut self, patch: &UpdatePlaceInput, now: DateTime<Utc>) -> Result<bool, PatchError> {
        if patch.id != self.id {
            return Err(PatchError::IdMismatch {
                place: self.id,
                patch: patch.id,
            });
        }

        let changes = [
            patch_field(&mut self.name, &patch.name),
            patch_field(&mut self.category, &patch.category),
            patch_field(&mut self.visit_status, &patch.visit_status),
            patch_field(&mut self.priority, &patch.priority),
            patch_field(&mut self.record_status, &patch.record_status),
            patch_optional(&mut self.region_main, &patch.region_main),
            patch_optional(&mut self.region_sub, &patch.region_sub),
            patch_optional(&mut self.address, &patch.address),
            patch_optional(&mut self.operating_hours, &patch.operating_hours),
            patch_optional(&mut self.parking_info, &patch.parking_info),
            patch_optional(&mut self.parking_memo, &patch.parking_memo),
            patch_optional(&mut self.keywords, &patch.keywords),
            patch_optional(&mut self.memo, &patch.memo),
            patch_optional(&mut self.source_url, &patch.source_url),
            patch_optional(&mut self.cover_image_url, &patch.cover_image_url),
            patch_optional(&mut self.start_date, &patch.start_date),
            patch_optional(&mut self.end_date, &patch.end_date),
        ];

        let changed = changes.iter().any(|c| *c);
        if changed {
            self.updated_at = now;
            tracing::debug!("place {} patched", self.id);
        }
        Ok(changed)
    }
}

impl PlaceFilters {
    pub fn matches(&self, place: &Place) -> bool {
        if self.category.map_or(false, |c| c != place.category) {
            return false;
        }
        if self.visit_status.map_or(false, |v| v != place.visit_status) {
            return false;
        }
        if self.priority.map_or(false, |p| p != place.priority) {
            return false;
        }
        if self.record_status.map_or(false, |r| r != place.record_status) {
            return false;
        }
        if let Some(region) = &self.region_main {
            if place.region_main.as_deref() != Some(region.as_str()) {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let needle = term.to_lowercase();
                let hit = |s: &str| s.to_lowercase().contains(&needle);
                hit(&place.name)
                    || place.address.as_deref().map_or(false, hit)
                    || place.memo.as_deref().map_or(false, hit)
                    || place.keywords.iter().flatten().any(|k| hit(k.as_str()))
            }
        }
    }
}
