use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cache records soft-expire this many days after creation.
pub const CACHE_TTL_DAYS: i64 = 30;

/// Longest TTL any record or source may carry, ten years.
pub const MAX_TTL_DAYS: i64 = 3650;

// ============ Prospect identity ============

/// Identity fields used to locate a prospect's cache record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProspectInput {
    /// Full name of the prospect.
    pub name: String,
    /// Street address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// State or region code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Alias kept for call sites that only care about identity.
pub type ProspectIdentifier = ProspectInput;

impl ProspectInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}

// ============ Cache document ============

/// One tool's output, stamped with when it was cached and when it lapses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSource {
    pub data: Value,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CachedSource {
    pub fn new(data: Value, cached_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            data,
            cached_at,
            expires_at: expiry(cached_at, ttl),
        }
    }
}

/// `from + ttl` with `ttl` capped at [`MAX_TTL_DAYS`].
fn expiry(from: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    let ttl = ttl.min(Duration::days(MAX_TTL_DAYS));
    from.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Coarse completeness tier derived from the verified sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Limited,
    Partial,
    Complete,
}

impl DataQuality {
    /// `>= 3` verified sources is complete, `>= 1` is partial.
    pub fn from_verified_count(count: usize) -> Self {
        match count {
            0 => DataQuality::Limited,
            1 | 2 => DataQuality::Partial,
            _ => DataQuality::Complete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataQuality::Limited => "limited",
            DataQuality::Partial => "partial",
            DataQuality::Complete => "complete",
        }
    }
}

/// Source slots of a [`ProspectDataCache`] document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheField {
    SecInsider,
    FecContributions,
    CountyAssessor,
    Propublica990,
    PropertyValuation,
    BusinessRegistry,
    VoterRegistration,
    FamilyDiscovery,
    Wikidata,
    WebSearch,
    RevenueEstimate,
}

impl CacheField {
    pub const ALL: [CacheField; 11] = [
        CacheField::SecInsider,
        CacheField::FecContributions,
        CacheField::CountyAssessor,
        CacheField::Propublica990,
        CacheField::PropertyValuation,
        CacheField::BusinessRegistry,
        CacheField::VoterRegistration,
        CacheField::FamilyDiscovery,
        CacheField::Wikidata,
        CacheField::WebSearch,
        CacheField::RevenueEstimate,
    ];

    /// The only fields that count towards [`DataQuality`].
    pub const VERIFIED: [CacheField; 4] = [
        CacheField::SecInsider,
        CacheField::FecContributions,
        CacheField::CountyAssessor,
        CacheField::Propublica990,
    ];

    /// JSON key of the field inside the cache document.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheField::SecInsider => "secInsider",
            CacheField::FecContributions => "fecContributions",
            CacheField::CountyAssessor => "countyAssessor",
            CacheField::Propublica990 => "propublica990",
            CacheField::PropertyValuation => "propertyValuation",
            CacheField::BusinessRegistry => "businessRegistry",
            CacheField::VoterRegistration => "voterRegistration",
            CacheField::FamilyDiscovery => "familyDiscovery",
            CacheField::Wikidata => "wikidata",
            CacheField::WebSearch => "webSearch",
            CacheField::RevenueEstimate => "revenueEstimate",
        }
    }

    /// Human-readable source name used in citations and exports.
    pub fn label(&self) -> &'static str {
        match self {
            CacheField::SecInsider => "SEC insider filings",
            CacheField::FecContributions => "FEC political contributions",
            CacheField::CountyAssessor => "County assessor records",
            CacheField::Propublica990 => "ProPublica Form 990 filings",
            CacheField::PropertyValuation => "Property valuation",
            CacheField::BusinessRegistry => "State business registry",
            CacheField::VoterRegistration => "Voter registration",
            CacheField::FamilyDiscovery => "Family discovery",
            CacheField::Wikidata => "Wikidata",
            CacheField::WebSearch => "Web search",
            CacheField::RevenueEstimate => "Business revenue estimate",
        }
    }

    pub fn is_verified(&self) -> bool {
        Self::VERIFIED.contains(self)
    }
}

/// Per-prospect research document, one per cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProspectDataCache {
    pub cache_key: String,
    pub prospect: ProspectInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sec_insider: Option<CachedSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fec_contributions: Option<CachedSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county_assessor: Option<CachedSource>,
    #[serde(
        default,
        rename = "propublica990",
        skip_serializing_if = "Option::is_none"
    )]
    pub propublica_990: Option<CachedSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_valuation: Option<CachedSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_registry: Option<CachedSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voter_registration: Option<CachedSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_discovery: Option<CachedSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikidata: Option<CachedSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_search: Option<CachedSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_estimate: Option<CachedSource>,
    pub data_quality: DataQuality,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ProspectDataCache {
    /// Empty record written on the first collection request for a prospect.
    pub fn skeleton(
        cache_key: String,
        prospect: ProspectInput,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            cache_key,
            prospect,
            sec_insider: None,
            fec_contributions: None,
            county_assessor: None,
            propublica_990: None,
            property_valuation: None,
            business_registry: None,
            voter_registration: None,
            family_discovery: None,
            wikidata: None,
            web_search: None,
            revenue_estimate: None,
            data_quality: DataQuality::Limited,
            created_at: now,
            updated_at: now,
            expires_at: expiry(now, ttl),
        }
    }

    pub fn field(&self, field: CacheField) -> Option<&CachedSource> {
        match field {
            CacheField::SecInsider => self.sec_insider.as_ref(),
            CacheField::FecContributions => self.fec_contributions.as_ref(),
            CacheField::CountyAssessor => self.county_assessor.as_ref(),
            CacheField::Propublica990 => self.propublica_990.as_ref(),
            CacheField::PropertyValuation => self.property_valuation.as_ref(),
            CacheField::BusinessRegistry => self.business_registry.as_ref(),
            CacheField::VoterRegistration => self.voter_registration.as_ref(),
            CacheField::FamilyDiscovery => self.family_discovery.as_ref(),
            CacheField::Wikidata => self.wikidata.as_ref(),
            CacheField::WebSearch => self.web_search.as_ref(),
            CacheField::RevenueEstimate => self.revenue_estimate.as_ref(),
        }
    }

    fn field_mut(&mut self, field: CacheField) -> &mut Option<CachedSource> {
        match field {
            CacheField::SecInsider => &mut self.sec_insider,
            CacheField::FecContributions => &mut self.fec_contributions,
            CacheField::CountyAssessor => &mut self.county_assessor,
            CacheField::Propublica990 => &mut self.propublica_990,
            CacheField::PropertyValuation => &mut self.property_valuation,
            CacheField::BusinessRegistry => &mut self.business_registry,
            CacheField::VoterRegistration => &mut self.voter_registration,
            CacheField::FamilyDiscovery => &mut self.family_discovery,
            CacheField::Wikidata => &mut self.wikidata,
            CacheField::WebSearch => &mut self.web_search,
            CacheField::RevenueEstimate => &mut self.revenue_estimate,
        }
    }

    /// Stores `source` in `field`, bumps `updated_at` and recomputes the quality tier.
    pub fn set_field(&mut self, field: CacheField, source: CachedSource, now: DateTime<Utc>) {
        *self.field_mut(field) = Some(source);
        self.updated_at = now;
        self.refresh_data_quality();
    }

    pub fn verified_source_count(&self) -> usize {
        CacheField::VERIFIED
            .iter()
            .filter(|f| self.field(**f).is_some())
            .count()
    }

    pub fn refresh_data_quality(&mut self) {
        self.data_quality = DataQuality::from_verified_count(self.verified_source_count());
    }

    pub fn populated_fields(&self) -> Vec<CacheField> {
        CacheField::ALL
            .iter()
            .copied()
            .filter(|f| self.field(*f).is_some())
            .collect()
    }
}

// ============ Tool invocation ============

/// Tagged outcome of a single research tool call. Failures are data, not errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult<T> {
    pub tool_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl<T> ToolResult<T> {
    pub fn succeeded(tool_name: impl Into<String>, data: T, duration_ms: u64) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            data: Some(data),
            error: None,
            duration_ms,
        }
    }

    pub fn failed(tool_name: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            data: None,
            error: Some(error.into()),
            duration_ms,
        }
    }
}

// ============ API Request/Response Models ============

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectRequest {
    pub prospect: ProspectInput,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectResponse {
    pub cache_key: String,
    pub from_cache: bool,
    pub stale: bool,
    pub data_quality: DataQuality,
    pub data: ProspectDataCache,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultRequest {
    pub prospect: ProspectInput,
    pub tool_name: String,
    pub result: Value,
    /// Lifetime of this source entry; defaults to the cache TTL.
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultResponse {
    pub updated: bool,
    pub cache_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_quality: Option<DataQuality>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheQueryParams {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl From<CacheQueryParams> for ProspectInput {
    fn from(params: CacheQueryParams) -> Self {
        Self {
            name: params.name,
            address: params.address,
            city: params.city,
            state: params.state,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportParams {
    pub limit: Option<usize>,
}
