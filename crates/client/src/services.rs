//! Per-resource services: list/get/create/update/delete over one mapper,
//! with cache tags

use std::marker::PhantomData;

use emr_core::resources::{
    AllergyIntoleranceMapper, AppointmentMapper, ConditionMapper, EncounterMapper,
    LocationMapper, MedicationMapper, MedicationRequestMapper, PatientMapper, PractitionerMapper,
};
use emr_core::{MappingError, ResourceMapper, SortDirection};
use serde::{Deserialize, Serialize};

use crate::cache::{QueryCache, Tag};
use crate::client::{FhirClient, ReadRequest, SearchRequest, SearchResult};
use crate::config::ClientConfig;
use crate::query::{FhirApi, QueryResult};

/// Paged, sorted, filtered list request in application terms
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest<F> {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub filters: F,
    pub sort_fields: Vec<String>,
    pub sort_directions: Vec<SortDirection>,
    pub result_fields: Vec<String>,
}

/// One page of records and the server's exact total
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u32,
}

/// CRUD operations for one resource kind
pub struct ResourceService<M: ResourceMapper> {
    api: FhirApi,
    cache: QueryCache,
    _mapper: PhantomData<fn() -> M>,
}

impl<M: ResourceMapper> Clone for ResourceService<M> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            cache: self.cache.clone(),
            _mapper: PhantomData,
        }
    }
}

impl<M: ResourceMapper> ResourceService<M> {
    pub fn new(api: FhirApi, cache: QueryCache) -> Self {
        Self {
            api,
            cache,
            _mapper: PhantomData,
        }
    }

    pub fn resource_type(&self) -> &'static str {
        M::resource_type()
    }

    /// Wire search for an application list request
    pub fn search_request(&self, request: &ListRequest<M::Filters>) -> SearchRequest {
        SearchRequest {
            resource_type: M::resource_type().to_string(),
            page: request.page,
            page_size: request.page_size,
            filters: M::to_filter_params(&request.filters),
            sort_fields: M::to_sort_fields(&request.sort_fields, &request.sort_directions),
            result_fields: request.result_fields.clone(),
        }
    }

    pub async fn list(&self, request: &ListRequest<M::Filters>) -> QueryResult<Page<M::Record>> {
        let search = self.search_request(request);
        let key = format!("{}?{}", M::resource_type(), search.to_form_body());
        if let Some(page) = self.cache.get::<Page<M::Record>>(&key) {
            return QueryResult::Data(page);
        }

        let result = self.api.search(&search, to_page::<M>).await;
        if let QueryResult::Data(page) = &result {
            let mut tags = vec![Tag::list(M::resource_type())];
            tags.extend(
                page.data
                    .iter()
                    .filter_map(M::record_id)
                    .map(|id| Tag::new(M::resource_type(), id)),
            );
            self.cache.insert(key, page.clone(), tags);
        }
        result
    }

    pub async fn get(&self, id: &str) -> QueryResult<M::Record> {
        let key = format!("{}/{}", M::resource_type(), id);
        if let Some(record) = self.cache.get::<M::Record>(&key) {
            return QueryResult::Data(record);
        }

        let read = ReadRequest::new(M::resource_type(), id);
        let result = self.api.get_by_id(&read, M::from_json).await;
        if let QueryResult::Data(record) = &result {
            self.cache
                .insert(key, record.clone(), vec![Tag::new(M::resource_type(), id)]);
        }
        result
    }

    pub async fn create(&self, record: &M::Record) -> QueryResult<M::Record> {
        let result = self.api.create(record, M::to_json, M::from_json).await;
        if result.is_data() {
            self.cache.invalidate(&[Tag::list(M::resource_type())]);
        }
        result
    }

    pub async fn update(&self, record: &M::Record) -> QueryResult<M::Record> {
        let result = self
            .api
            .update(record, with_id::<M>, M::from_json)
            .await;
        if result.is_data() {
            self.invalidate(M::record_id(record).unwrap_or_default());
        }
        result
    }

    pub async fn delete(&self, id: &str) -> QueryResult<()> {
        let result = self.api.delete(M::resource_type(), id).await;
        if result.is_data() {
            self.invalidate(id);
        }
        result
    }

    fn invalidate(&self, id: &str) {
        self.cache.invalidate(&[
            Tag::list(M::resource_type()),
            Tag::new(M::resource_type(), id),
        ]);
    }
}

fn to_page<M: ResourceMapper>(found: SearchResult) -> Result<Page<M::Record>, MappingError> {
    let data = found
        .entries
        .into_iter()
        .map(M::from_json)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        data,
        total: found.total,
    })
}

/// Update payloads must carry the record's id
fn with_id<M: ResourceMapper>(record: &M::Record) -> Result<serde_json::Value, MappingError> {
    if M::record_id(record).is_none_or(|id| id.trim().is_empty()) {
        return Err(MappingError::MissingId(M::resource_type()));
    }
    M::to_json(record)
}

/// One service per resource kind, sharing a client and a cache
#[derive(Clone)]
pub struct Services {
    pub cache: QueryCache,
    pub patients: ResourceService<PatientMapper>,
    pub practitioners: ResourceService<PractitionerMapper>,
    pub conditions: ResourceService<ConditionMapper>,
    pub allergy_intolerances: ResourceService<AllergyIntoleranceMapper>,
    pub medications: ResourceService<MedicationMapper>,
    pub medication_requests: ResourceService<MedicationRequestMapper>,
    pub encounters: ResourceService<EncounterMapper>,
    pub appointments: ResourceService<AppointmentMapper>,
    pub locations: ResourceService<LocationMapper>,
}

impl Services {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client(FhirClient::new(config))
    }

    pub fn with_client(client: FhirClient) -> Self {
        let api = FhirApi::new(client);
        let cache = QueryCache::new();

        Self {
            patients: ResourceService::new(api.clone(), cache.clone()),
            practitioners: ResourceService::new(api.clone(), cache.clone()),
            conditions: ResourceService::new(api.clone(), cache.clone()),
            allergy_intolerances: ResourceService::new(api.clone(), cache.clone()),
            medications: ResourceService::new(api.clone(), cache.clone()),
            medication_requests: ResourceService::new(api.clone(), cache.clone()),
            encounters: ResourceService::new(api.clone(), cache.clone()),
            appointments: ResourceService::new(api.clone(), cache.clone()),
            locations: ResourceService::new(api, cache.clone()),
            cache,
        }
    }
}
