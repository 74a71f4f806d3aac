//! Failed CI jobs of a GitLab project
//!
//! The `project` parameter is a path such as `group/project` or a numeric
//! id. A path is first resolved to the project id; when that lookup fails
//! the URL-encoded path is used instead, which the jobs API also accepts.
//! Jobs are then paged through by following the `Link: rel="next"` header.

use serde::Deserialize;
use url::Url;

use crate::collector::pagination::{last_page, next_link, pages_fetched};
use crate::collector::{
    CollectError, CollectResult, FetchedResponse, ParseContext, ParsedSource, RequestSpec,
    SourceAdapter, SourceParameters,
};
use crate::model::{Attributes, RawEntity};
use crate::normalize::EntityFilter;

const PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
struct GitLabParameters {
    project: String,
    /// Branches to count failed jobs of; empty means all
    #[serde(default)]
    branches: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Project {
    id: u64,
    web_url: Option<Url>,
}

#[derive(Debug, Deserialize)]
struct Job {
    id: u64,
    name: String,
    #[serde(default)]
    stage: String,
    #[serde(rename = "ref", default)]
    branch: String,
    #[serde(default)]
    web_url: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    failure_reason: Option<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GitLabFailedJobs;

impl GitLabFailedJobs {
    fn parameters(params: &SourceParameters) -> CollectResult<GitLabParameters> {
        let decoded: GitLabParameters = params.decode()?;
        if decoded.project.trim().is_empty() {
            return Err(CollectError::missing_parameter("project"));
        }
        Ok(decoded)
    }

    /// `<base>/api/v4/<segments...>`; segments are percent-encoded whole
    fn endpoint(base: &Url, segments: &[&str]) -> CollectResult<Url> {
        let mut url = base.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| CollectError::configuration("'url' is not a GitLab instance url"))?
            .pop_if_empty()
            .extend(["api", "v4"])
            .extend(segments);
        Ok(url)
    }

    fn jobs_url(base: &Url, project: &str) -> CollectResult<Url> {
        let mut url = Self::endpoint(base, &["projects", project, "jobs"])?;
        url.query_pairs_mut()
            .append_pair("scope[]", "failed")
            .append_pair("per_page", PAGE_SIZE);
        Ok(url)
    }

    fn is_numeric(project: &str) -> bool {
        project.chars().all(|c| c.is_ascii_digit())
    }

    /// The project as resolved by the lookup, if it succeeded
    fn resolved_project(responses: &[FetchedResponse]) -> Option<Project> {
        responses
            .iter()
            .filter(|r| r.is_lookup())
            .find_map(FetchedResponse::response)
            .and_then(|response| response.json::<Project>().ok())
    }

    /// How the jobs api should address the project
    fn project_ref(project: &str, responses: &[FetchedResponse]) -> String {
        Self::resolved_project(responses)
            .map(|p| p.id.to_string())
            .unwrap_or_else(|| project.to_string())
    }
}

impl SourceAdapter for GitLabFailedJobs {
    fn source_type(&self) -> &'static str {
        "gitlab_failed_jobs"
    }

    fn token_header(&self) -> Option<&'static str> {
        Some("Private-Token")
    }

    fn validate(&self, params: &SourceParameters) -> CollectResult<()> {
        let base = params.require_url()?;
        let parameters = Self::parameters(params)?;
        Self::jobs_url(base, &parameters.project).map(|_| ())
    }

    fn api_url(&self, params: &SourceParameters) -> Option<Url> {
        let project = Self::parameters(params).ok()?.project;
        Self::jobs_url(params.url.as_ref()?, &project).ok()
    }

    fn landing_url(&self, params: &SourceParameters) -> Option<Url> {
        let project = Self::parameters(params).ok()?.project;
        let mut url = params.url.clone()?;
        url.set_query(None);
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(project.split('/'))
            .extend(["-", "jobs"]);
        Some(url)
    }

    fn entity_filter(&self, params: &SourceParameters) -> EntityFilter {
        let mut config = params.filter.clone();
        if let Ok(parameters) = Self::parameters(params) {
            if !parameters.branches.is_empty() {
                config
                    .allowed_values
                    .entry("branch".to_string())
                    .or_default()
                    .extend(parameters.branches);
            }
        }
        EntityFilter::new(&config)
    }

    fn next_request(
        &self,
        params: &SourceParameters,
        responses: &[FetchedResponse],
    ) -> CollectResult<Option<RequestSpec>> {
        let base = params.require_url()?;
        let project = Self::parameters(params)?.project;

        if responses.is_empty() && !Self::is_numeric(&project) {
            let lookup = Self::endpoint(base, &["projects", &project])?;
            return Ok(Some(
                RequestSpec::get(lookup).lookup("the URL-encoded project path"),
            ));
        }

        if pages_fetched(responses) == 0 {
            let project = Self::project_ref(&project, responses);
            return Ok(Some(RequestSpec::get(Self::jobs_url(base, &project)?)));
        }

        Ok(last_page(responses)
            .and_then(next_link)
            .map(RequestSpec::get))
    }

    fn parse(&self, context: &ParseContext<'_>) -> CollectResult<ParsedSource> {
        let mut entities = Vec::new();
        for document in &context.documents {
            let jobs: Vec<Job> = document.json()?;
            entities.extend(jobs.into_iter().map(|job| {
                let mut attributes = Attributes::new();
                attributes.insert("name".into(), job.name.into());
                attributes.insert("stage".into(), job.stage.into());
                attributes.insert("branch".into(), job.branch.into());
                attributes.insert("url".into(), job.web_url.unwrap_or_default().into());
                attributes.insert("build_date".into(), job.created_at.unwrap_or_default().into());
                attributes.insert(
                    "failure_type".into(),
                    job.failure_reason.unwrap_or_default().into(),
                );
                RawEntity::new(attributes).with_natural_id(job.id.to_string())
            }));
        }

        let landing_url = Self::resolved_project(context.responses)
            .and_then(|project| project.web_url)
            .and_then(|mut url| {
                url.path_segments_mut().ok()?.pop_if_empty().extend(["-", "jobs"]);
                Some(url)
            });

        Ok(ParsedSource {
            landing_url,
            ..ParsedSource::entities(entities)
        })
    }
}
