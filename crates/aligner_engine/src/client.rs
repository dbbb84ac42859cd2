use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};

use aligner_core::{Job, OutputFormat, PipelineKind, RunConfig, SymbolSet};

use crate::audio::AudioSlicer;
use crate::payload::{signal_part, text_part, FilePart};
use crate::response::parse_reply;
use crate::types::{AlignReply, ClientError, FailureKind};

/// Default endpoint of the public alignment pipeline service.
pub const PIPELINE_ENDPOINT: &str =
    "https://clarin.phonetik.uni-muenchen.de/BASWebServices/services/runPipeline";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub endpoint: String,
    pub connect_timeout: Duration,
    /// Whole-request budget; alignment of long recordings is slow, so this
    /// is generous by default.
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: PIPELINE_ENDPOINT.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(600),
        }
    }
}

/// One fully-resolved remote call: payload parts plus the service fields.
#[derive(Debug, Clone)]
pub struct AlignRequest {
    pub signal: FilePart,
    pub text: FilePart,
    pub language: String,
    pub output_format: OutputFormat,
    pub pipeline: PipelineKind,
    pub preseg: bool,
    pub output_symbol: SymbolSet,
}

/// Resolve a job against the run configuration into a submittable request.
///
/// Applies the per-stem language override, reads or slices the audio, and
/// encodes the transcript part.
pub fn build_request(
    job: &Job,
    config: &RunConfig,
    slicer: &dyn AudioSlicer,
) -> Result<AlignRequest, ClientError> {
    let language = config.language_for(&job.stem()).to_string();
    let signal = signal_part(&job.audio, job.window, slicer)?;
    let text = text_part(job.text.as_deref(), job.inline_text.as_deref())?;
    Ok(AlignRequest {
        signal,
        text,
        language,
        output_format: config.output_format,
        pipeline: config.pipeline,
        preseg: config.preseg,
        output_symbol: config.output_symbol,
    })
}

/// Executes one remote alignment call and fetches the result artifact.
#[async_trait]
pub trait AlignClient: Send + Sync {
    async fn run_pipeline(&self, request: AlignRequest) -> Result<AlignReply, ClientError>;

    async fn fetch_artifact(&self, link: &str) -> Result<String, ClientError>;
}

/// reqwest-backed client for the alignment web service.
#[derive(Debug, Clone)]
pub struct HttpAlignClient {
    settings: ClientSettings,
    http: reqwest::Client,
}

impl HttpAlignClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        url::Url::parse(&settings.endpoint)
            .map_err(|err| ClientError::new(FailureKind::InvalidEndpoint, err.to_string()))?;
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ClientError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, http })
    }
}

#[async_trait]
impl AlignClient for HttpAlignClient {
    async fn run_pipeline(&self, request: AlignRequest) -> Result<AlignReply, ClientError> {
        debug!(
            "submitting {} ({} bytes) to {}",
            request.signal.filename,
            request.signal.bytes.len(),
            self.settings.endpoint
        );
        let form = Form::new()
            .part(
                "SIGNAL",
                Part::bytes(request.signal.bytes).file_name(request.signal.filename),
            )
            .part(
                "TEXT",
                Part::bytes(request.text.bytes).file_name(request.text.filename),
            )
            .text("LANGUAGE", request.language)
            .text("OUTFORMAT", request.output_format.as_str())
            .text("PIPE", request.pipeline.as_str())
            .text("PRESEG", if request.preseg { "true" } else { "false" })
            .text("OUTSYMBOL", request.output_symbol.as_str());

        let response = self
            .http
            .post(&self.settings.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        let body = response.text().await.map_err(map_reqwest_error)?;
        parse_reply(&body)
    }

    async fn fetch_artifact(&self, link: &str) -> Result<String, ClientError> {
        debug!("fetching alignment artifact from {link}");
        let response = self
            .http
            .get(link)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        response.text().await.map_err(map_reqwest_error)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        return ClientError::new(FailureKind::Timeout, err.to_string());
    }
    ClientError::new(FailureKind::Network, err.to_string())
}
