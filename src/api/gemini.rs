use crate::api::{GenerationService, OperationError, VideoOperation};
use crate::config::StudioConfig;
use crate::error::{GenError, GenResult, JobKind};
use crate::media::{MediaPayload, MediaSet};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::warn;

/// REST client for the Generative Language API. One instance serves all
/// four job kinds; the models it addresses come from the config.
pub struct GeminiClient {
    client: Client,
    config: StudioConfig,
}

impl GeminiClient {
    pub fn new(config: StudioConfig) -> GenResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn with_client(client: Client, config: StudioConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.api_base, model, self.config.api_key
        )
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
        kind: JobKind,
    ) -> GenResult<GenerateResponse> {
        let resp = self
            .client
            .post(self.generate_url(model))
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_api_error(status.as_u16(), &body, kind));
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate_plan(&self, prompt: &str, fields: &[&str]) -> GenResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt)],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(scene_schema(fields)),
                response_modalities: None,
                speech_config: None,
            }),
        };

        let response = self
            .generate(&self.config.planning_model, &request, JobKind::TextPlan)
            .await?;
        first_text(&response)
            .map(str::to_string)
            .ok_or(GenError::EmptyResponse(JobKind::TextPlan))
    }

    async fn generate_image(
        &self,
        media: &MediaSet,
        instruction: &str,
    ) -> GenResult<MediaPayload> {
        let mut parts: Vec<Part> = media
            .references()
            .iter()
            .map(|r| Part::inline(r.mime_type.clone(), r.encoded_data()))
            .collect();
        parts.push(Part::text(instruction));

        let request = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: Some(GenerationConfig {
                response_mime_type: None,
                response_schema: None,
                response_modalities: Some(vec!["IMAGE".to_string()]),
                speech_config: None,
            }),
        };

        let response = self
            .generate(&self.config.image_model, &request, JobKind::Image)
            .await?;
        decode_inline_payload(response, JobKind::Image)
    }

    async fn generate_image_from_text(&self, prompt: &str) -> GenResult<MediaPayload> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt)],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: None,
                response_schema: None,
                response_modalities: Some(vec!["IMAGE".to_string()]),
                speech_config: None,
            }),
        };

        let response = self
            .generate(&self.config.image_model, &request, JobKind::Image)
            .await?;
        decode_inline_payload(response, JobKind::Image)
    }

    async fn synthesize_speech(&self, text: &str) -> GenResult<MediaPayload> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::text(text)],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: None,
                response_schema: None,
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.config.voice_name.clone(),
                        },
                    },
                }),
            }),
        };

        let response = self
            .generate(&self.config.tts_model, &request, JobKind::Voice)
            .await?;
        decode_inline_payload(response, JobKind::Voice)
    }

    async fn submit_video(
        &self,
        still: &MediaPayload,
        instruction: &str,
    ) -> GenResult<VideoOperation> {
        let request = VideoRequest {
            instances: vec![VideoInstance {
                prompt: instruction.to_string(),
                image: VideoImage {
                    bytes_base64_encoded: STANDARD.encode(&still.bytes),
                    mime_type: still.mime_type.clone(),
                },
            }],
            parameters: VideoParameters {
                aspect_ratio: self.config.aspect_ratio.clone(),
                resolution: self.config.resolution.clone(),
                sample_count: 1,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:predictLongRunning?key={}",
            self.config.api_base, self.config.video_model, self.config.api_key
        );
        let resp = self.client.post(&url).json(&request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_api_error(status.as_u16(), &body, JobKind::Video));
        }

        let submitted: SubmittedOperation = resp.json().await?;
        Ok(VideoOperation {
            name: submitted.name,
            done: false,
            error: None,
            video_uri: None,
        })
    }

    async fn refresh_video(&self, operation: VideoOperation) -> GenResult<VideoOperation> {
        let url = format!(
            "{}/v1beta/{}?key={}",
            self.config.api_base, operation.name, self.config.api_key
        );
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_api_error(status.as_u16(), &body, JobKind::Video));
        }

        let snapshot: OperationStatus = resp.json().await?;
        Ok(operation_from_status(operation.name, snapshot))
    }

    async fn fetch_video(&self, uri: &str) -> GenResult<MediaPayload> {
        // Download locators already carry a query string; the key is
        // appended the same way the result URI hands it out.
        let url = format!("{uri}&key={}", self.config.api_key);
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if body.contains("Requested entity was not found.") {
                return Err(GenError::CredentialInvalid);
            }
            warn!("video download failed with HTTP {}", status.as_u16());
            return Err(GenError::DownloadFailed(status.as_u16()));
        }

        let bytes = resp.bytes().await?.to_vec();
        Ok(MediaPayload::new(bytes, "video/mp4"))
    }
}

fn classify_api_error(status: u16, body: &str, kind: JobKind) -> GenError {
    if status == 429 || body.contains("RESOURCE_EXHAUSTED") {
        return GenError::RateLimited;
    }
    if body.contains("API key not valid") {
        return GenError::CredentialInvalid;
    }

    let message = api_error_message(body);
    warn!("{} call failed with HTTP {}: {}", kind, status, message);
    GenError::Api { status, message }
}

// The standard error envelope is {"error":{"code":..,"message":..}};
// fall back to a raw snippet when the body is something else.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|root| {
            root.get("error")?
                .get("message")?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(300).collect())
}

fn first_text(response: &GenerateResponse) -> Option<&str> {
    response
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .iter()
        .find_map(|p| p.text.as_deref())
}

fn decode_inline_payload(response: GenerateResponse, kind: JobKind) -> GenResult<MediaPayload> {
    let inline = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .find_map(|p| p.inline_data);

    let inline = match inline {
        Some(inline) => inline,
        None => {
            return Err(match kind {
                JobKind::Voice => GenError::VoiceSynthesis,
                other => GenError::EmptyResponse(other),
            });
        }
    };

    let bytes = STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|e| GenError::encoding(format!("invalid base64 in {kind} response: {e}")))?;
    let mime_type = if inline.mime_type.is_empty() {
        default_mime_for(kind)
    } else {
        inline.mime_type
    };
    Ok(MediaPayload { bytes, mime_type })
}

fn default_mime_for(kind: JobKind) -> String {
    match kind {
        JobKind::Voice => "audio/mpeg",
        JobKind::Video => "video/mp4",
        JobKind::TextPlan | JobKind::Image => "image/png",
    }
    .to_string()
}

fn scene_schema(fields: &[&str]) -> Value {
    let mut properties = serde_json::Map::new();
    for field in fields {
        properties.insert((*field).to_string(), json!({ "type": "STRING" }));
    }
    json!({
        "type": "OBJECT",
        "properties": {
            "scenes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": Value::Object(properties),
                    "required": fields,
                }
            }
        },
        "required": ["scenes"],
    })
}

fn operation_from_status(name: String, status: OperationStatus) -> VideoOperation {
    let video_uri = status
        .response
        .as_ref()
        .and_then(|r| r.generate_video_response.as_ref())
        .and_then(|r| r.generated_samples.as_ref())
        .and_then(|samples| samples.first())
        .and_then(|sample| sample.video.as_ref())
        .map(|video| video.uri.clone());

    VideoOperation {
        name,
        done: status.done.unwrap_or(false),
        error: status.error.map(|e| OperationError {
            code: e.code,
            message: e.message,
        }),
        video_uri,
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline(mime_type: String, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData { mime_type, data }),
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(rename = "responseModalities", skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(rename = "speechConfig", skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
struct SpeechConfig {
    #[serde(rename = "voiceConfig")]
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
struct VoiceConfig {
    #[serde(rename = "prebuiltVoiceConfig")]
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
struct PrebuiltVoiceConfig {
    #[serde(rename = "voiceName")]
    voice_name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(rename = "inlineData")]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
struct ResponseInlineData {
    #[serde(rename = "mimeType", default)]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct VideoRequest {
    instances: Vec<VideoInstance>,
    parameters: VideoParameters,
}

#[derive(Debug, Serialize)]
struct VideoInstance {
    prompt: String,
    image: VideoImage,
}

#[derive(Debug, Serialize)]
struct VideoImage {
    #[serde(rename = "bytesBase64Encoded")]
    bytes_base64_encoded: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

#[derive(Debug, Serialize)]
struct VideoParameters {
    #[serde(rename = "aspectRatio")]
    aspect_ratio: String,
    resolution: String,
    #[serde(rename = "sampleCount")]
    sample_count: u32,
}

#[derive(Debug, Deserialize)]
struct SubmittedOperation {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    done: Option<bool>,
    response: Option<OperationResponse>,
    error: Option<OperationErrorRecord>,
}

#[derive(Debug, Deserialize)]
struct OperationErrorRecord {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct OperationResponse {
    #[serde(rename = "generateVideoResponse")]
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
struct GenerateVideoResponse {
    #[serde(rename = "generatedSamples")]
    generated_samples: Option<Vec<GeneratedSample>>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<SampleVideo>,
}

#[derive(Debug, Deserialize)]
struct SampleVideo {
    uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaReference, MediaRole};
    use crate::templates::SCENE_FIELDS;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        let mut config = StudioConfig::new("test-key");
        config.api_base = server.uri();
        GeminiClient::with_client(Client::new(), config)
    }

    #[tokio::test]
    async fn plan_call_sends_schema_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-pro:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "generationConfig": { "responseMimeType": "application/json" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [
                    { "content": { "parts": [ { "text": "{\"scenes\":[]}" } ] } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let raw = client
            .generate_plan("make a storyboard", &SCENE_FIELDS)
            .await
            .unwrap();
        assert_eq!(raw, "{\"scenes\":[]}");
    }

    #[tokio::test]
    async fn http_429_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .generate_plan("p", &SCENE_FIELDS)
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::RateLimited));
    }

    #[tokio::test]
    async fn invalid_key_body_maps_to_credential_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "API key not valid. Please pass a valid API key." }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .generate_plan("p", &SCENE_FIELDS)
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::CredentialInvalid));
    }

    #[tokio::test]
    async fn other_api_errors_keep_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": { "code": 500, "message": "internal" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .generate_plan("p", &SCENE_FIELDS)
            .await
            .unwrap_err();
        match err {
            GenError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "internal");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn image_call_decodes_the_inline_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash-image:generateContent"))
            .and(body_partial_json(json!({
                "generationConfig": { "responseModalities": ["IMAGE"] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [
                    { "content": { "parts": [
                        { "inlineData": { "mimeType": "image/png", "data": "YWJj" } }
                    ] } }
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let media = MediaSet::new(MediaReference::from_bytes(
            vec![1, 2, 3],
            "image/png",
            MediaRole::Product,
        ));
        let payload = client.generate_image(&media, "scene 1").await.unwrap();
        assert_eq!(payload.bytes, b"abc");
        assert_eq!(payload.mime_type, "image/png");
    }

    #[tokio::test]
    async fn image_response_without_payload_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [ { "content": { "parts": [ { "text": "sorry" } ] } } ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .generate_image_from_text("a portrait")
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::EmptyResponse(JobKind::Image)));
    }

    #[tokio::test]
    async fn speech_call_carries_the_voice_and_maps_missing_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash-preview-tts:generateContent"))
            .and(body_partial_json(json!({
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": {
                        "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": "Kore" } }
                    }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [ { "content": { "parts": [] } } ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.synthesize_speech("read this").await.unwrap_err();
        assert!(matches!(err, GenError::VoiceSynthesis));
    }

    #[tokio::test]
    async fn video_submit_poll_and_fetch_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1beta/models/veo-3.1-fast-generate-preview:predictLongRunning",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/op-1"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1beta/operations/op-1"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "done": true,
                "response": {
                    "generateVideoResponse": {
                        "generatedSamples": [
                            { "video": { "uri": format!("{}/files/clip.mp4?alt=media", server.uri()) } }
                        ]
                    }
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/clip.mp4"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4data".to_vec()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let still = MediaPayload::new(vec![9, 9], "image/png");

        let submitted = client.submit_video(&still, "animate").await.unwrap();
        assert_eq!(submitted.name, "operations/op-1");
        assert!(!submitted.done);

        let refreshed = client.refresh_video(submitted).await.unwrap();
        assert!(refreshed.done);
        let uri = refreshed.video_uri.expect("result locator");

        let video = client.fetch_video(&uri).await.unwrap();
        assert_eq!(video.bytes, b"mp4data");
        assert_eq!(video.mime_type, "video/mp4");
    }

    #[tokio::test]
    async fn pending_snapshot_keeps_done_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta/operations/op-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let pending = VideoOperation {
            name: "operations/op-2".to_string(),
            done: false,
            error: None,
            video_uri: None,
        };
        let refreshed = client.refresh_video(pending).await.unwrap();
        assert!(!refreshed.done);
        assert!(refreshed.error.is_none());
        assert!(refreshed.video_uri.is_none());
    }

    #[tokio::test]
    async fn failed_operation_carries_the_error_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta/operations/op-3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "done": true,
                "error": { "code": 13, "message": "internal render fault" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let pending = VideoOperation {
            name: "operations/op-3".to_string(),
            done: false,
            error: None,
            video_uri: None,
        };
        let refreshed = client.refresh_video(pending).await.unwrap();
        assert!(refreshed.done);
        let record = refreshed.error.expect("error record");
        assert_eq!(record.code, 13);
        assert_eq!(record.message, "internal render fault");
    }

    #[tokio::test]
    async fn download_failures_classify_by_body_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/gone.mp4"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string("Requested entity was not found."),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/broken.mp4"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let client = client_for(&server);

        let err = client
            .fetch_video(&format!("{}/files/gone.mp4?alt=media", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::CredentialInvalid));

        let err = client
            .fetch_video(&format!("{}/files/broken.mp4?alt=media", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::DownloadFailed(503)));
    }
}
