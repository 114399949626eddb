use crate::api::gemini::GeminiClient;
use crate::api::GenerationService;
use crate::config::StudioConfig;
use crate::credentials::{CredentialProvider, PreselectedKey};
use crate::error::{GenError, GenResult};
use crate::media::{MediaPayload, MediaSet, RenderedAsset};
use crate::plan::{parse_scene_plans, BrandingScene, ScenePlan};
use crate::poller::{poll_until_done, PollConfig};
use crate::sequencer::run_sequential;
use crate::templates::{
    compose_branding_prompt, compose_planning_prompt, BrandingParams, PlanParams,
    BRANDING_FIELDS, BRANDING_REQUIRED_FIELDS, SCENE_FIELDS,
};
use tracing::{debug, info, warn};

// Appended to every image instruction of a run so each call carries the
// same hard compositing constraints.
const COMPOSITING_RULES: &str = "\n\
[SYSTEM INSTRUCTION: MULTI-IMAGE COMPOSITING RULES]\n\
\n\
ROLE ASSIGNMENT FOR INPUT IMAGES:\n\
1. PRODUCT IMAGE (First Input):\n\
   - ROLE: OBJECT REFERENCE ONLY.\n\
   - ACTION: Extract the PRODUCT/ITEM shown.\n\
   - NEGATIVE PROMPT: IGNORE any human face, hands, skin, or body parts visible in this specific image. DO NOT transfer the identity from the product photo.\n\
\n\
2. MODEL IMAGE (Second Input - if provided):\n\
   - ROLE: IDENTITY & SUBJECT REFERENCE.\n\
   - ACTION: The main character in the generated image MUST look exactly like this person. Copy facial features, hair, and body type.\n\
   - REQUIREMENT: Maintain 100% facial consistency with this input.\n\
\n\
COMPOSITION RULES:\n\
- Create a realistic photo where the character from [MODEL IMAGE] is interacting with the item from [PRODUCT IMAGE].\n\
- STYLE: Photorealistic, High Resolution, Social Media Aesthetic (UGC).\n\
- LIGHTING: Natural, Flattering, consistent with the scene description.\n\
- NO HALLUCINATIONS: Do not generate extra limbs, distorted text, or morphed faces.\n";

/// Per-call switches for animating a scene.
#[derive(Debug, Clone, Copy, Default)]
pub struct VideoOptions {
    /// Mix subtle background music under the spoken line.
    pub background_music: bool,
}

/// A personal-branding plan with its rendered stills, index aligned.
#[derive(Debug, Clone)]
pub struct BrandingPackage {
    pub scenes: Vec<BrandingScene>,
    pub images: Vec<RenderedAsset>,
}

/// Top-level entry points for one generation run: plan the scenes, render
/// their stills, narrate, animate. Every operation composes the injected
/// service; nothing here is process-global.
pub struct AdStudio<S> {
    service: S,
    config: StudioConfig,
    credentials: Box<dyn CredentialProvider>,
}

impl AdStudio<GeminiClient> {
    /// Studio wired to the real generation service described by `config`.
    pub fn from_config(config: StudioConfig) -> GenResult<Self> {
        let service = GeminiClient::new(config.clone())?;
        Ok(Self::new(service, config))
    }
}

impl<S: GenerationService> AdStudio<S> {
    pub fn new(service: S, config: StudioConfig) -> Self {
        Self {
            service,
            config,
            credentials: Box::new(PreselectedKey),
        }
    }

    /// Route the video path's key check through the embedding
    /// application's selection flow.
    pub fn with_credentials(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.credentials = Box::new(provider);
        self
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// Plan the storyboard: compose the template prompt, run the planning
    /// call, and validate the response against the requested scene count.
    pub async fn plan_scenes(
        &self,
        template_id: &str,
        params: &PlanParams,
    ) -> GenResult<Vec<ScenePlan>> {
        let prompt = compose_planning_prompt(template_id, params)?;
        info!(
            template = template_id,
            scenes = params.scene_count,
            "requesting scene plan"
        );

        let raw = self.service.generate_plan(&prompt, &SCENE_FIELDS).await?;
        let plans = parse_scene_plans(&raw, params.scene_count, &SCENE_FIELDS)?;
        info!("scene plan accepted with {} scenes", plans.len());
        Ok(plans)
    }

    /// Render one still per scene prompt, strictly one call at a time with
    /// the configured pacing between calls. Every call carries the same
    /// media references and the same compositing rules. The first failure
    /// aborts the remaining scenes.
    pub async fn render_scene_images(
        &self,
        prompts: &[String],
        media: &MediaSet,
    ) -> GenResult<Vec<RenderedAsset>> {
        info!("rendering {} scene stills", prompts.len());

        let jobs: Vec<_> = prompts
            .iter()
            .enumerate()
            .map(|(index, prompt)| {
                let instruction = format!("{prompt}{COMPOSITING_RULES}");
                move || async move {
                    let payload = self.service.generate_image(media, &instruction).await?;
                    debug!(
                        scene = index + 1,
                        bytes = payload.bytes.len(),
                        "scene still rendered"
                    );
                    Ok(RenderedAsset {
                        scene_index: index,
                        payload,
                    })
                }
            })
            .collect();

        run_sequential(jobs, self.config.image_pacing()).await
    }

    /// Re-render a single scene still. No sequencing, no pacing.
    pub async fn regenerate_scene_image(
        &self,
        prompt: &str,
        media: &MediaSet,
        scene_index: usize,
    ) -> GenResult<RenderedAsset> {
        let instruction = format!("{prompt}{COMPOSITING_RULES}");
        let payload = self.service.generate_image(media, &instruction).await?;
        info!(scene = scene_index + 1, "scene still re-rendered");
        Ok(RenderedAsset {
            scene_index,
            payload,
        })
    }

    /// Narrate the full script with the configured voice.
    pub async fn synthesize_voice_over(&self, script: &str) -> GenResult<MediaPayload> {
        let instruction =
            format!("In a cheerful, friendly and casual tone, read the following script: {script}");
        let audio = self.service.synthesize_speech(&instruction).await?;
        info!(bytes = audio.bytes.len(), "voice-over synthesized");
        Ok(audio)
    }

    /// Animate one scene still into a short vertical clip: check the
    /// credential, submit the long-running job, poll it to a terminal
    /// state, and download the result.
    pub async fn render_scene_video(
        &self,
        still: &MediaPayload,
        scene: &ScenePlan,
        options: VideoOptions,
    ) -> GenResult<MediaPayload> {
        self.ensure_credential().await?;

        let instruction = video_instruction(scene, &self.config.aspect_ratio, options);
        let operation = self.service.submit_video(still, &instruction).await?;
        info!(operation = %operation.name, "video generation submitted");

        let poll_config = PollConfig {
            interval: self.config.poll_interval(),
            max_polls: self.config.max_polls,
        };
        let terminal = poll_until_done(
            operation,
            |op| self.service.refresh_video(op),
            &poll_config,
        )
        .await?;

        if let Some(error) = terminal.error {
            warn!(code = error.code, "video operation failed: {}", error.message);
            return Err(GenError::video_generation(error.message));
        }
        // Done without a result locator: the service dropped the output,
        // which in practice means the safety filter did.
        let uri = terminal.video_uri.ok_or(GenError::SafetyBlocked)?;

        info!("video ready, downloading");
        self.service.fetch_video(&uri).await
    }

    /// One planning call over the audience analysis inputs, then one
    /// text-only still per scene with the same pacing and fail-fast
    /// semantics as ad rendering.
    pub async fn personal_branding_package(
        &self,
        params: &BrandingParams,
    ) -> GenResult<BrandingPackage> {
        let prompt = compose_branding_prompt(params)?;
        info!(scenes = params.scene_count, "requesting branding plan");

        let raw = self.service.generate_plan(&prompt, &BRANDING_FIELDS).await?;
        let scenes: Vec<BrandingScene> =
            parse_scene_plans(&raw, params.scene_count, &BRANDING_REQUIRED_FIELDS)?;

        let jobs: Vec<_> = scenes
            .iter()
            .enumerate()
            .map(|(index, scene)| {
                let prompt = scene.image_prompt.clone();
                move || async move {
                    let payload = self.service.generate_image_from_text(&prompt).await?;
                    debug!(scene = index + 1, "branding still rendered");
                    Ok(RenderedAsset {
                        scene_index: index,
                        payload,
                    })
                }
            })
            .collect();
        let images = run_sequential(jobs, self.config.image_pacing()).await?;

        info!("branding package complete with {} scenes", scenes.len());
        Ok(BrandingPackage { scenes, images })
    }

    // The interactive selection flow runs at most once per call; still no
    // key afterwards is terminal.
    async fn ensure_credential(&self) -> GenResult<()> {
        if self.credentials.has_selected_key().await {
            return Ok(());
        }
        self.credentials.request_key_selection().await;
        if self.credentials.has_selected_key().await {
            return Ok(());
        }
        Err(GenError::CredentialMissing)
    }
}

fn video_instruction(scene: &ScenePlan, aspect_ratio: &str, options: VideoOptions) -> String {
    let audio = if options.background_music {
        "AUDIO: Include subtle background music and speech."
    } else {
        "AUDIO: Clear speech only. NO BACKGROUND MUSIC. The sound of the model speaking the script."
    };

    format!(
        "(VERTICAL {aspect_ratio} VIDEO) {animation}.\n\
         STRICT OUTPUT FORMAT: (VERTICAL {aspect_ratio} ASPECT RATIO). The video must be {aspect_ratio} portrait. CROP THE INPUT IMAGE TO VERTICAL {aspect_ratio} TO FILL THE SCREEN. NO LETTERBOX. NO BLACK BARS.\n\
         NEGATIVE CONSTRAINTS: DO NOT include any TEXT, SUBTITLES, CAPTIONS, WATERMARKS, or LOGOS. DO NOT morph the face. NO DISTORTION.\n\
         VISUAL QUALITY: High definition, cinematic lighting, social media aesthetic.\n\
         CONSISTENCY: The character's face and identity MUST remain exactly the same as the input image.\n\
         ACTION: {animation}. The model should be looking at the camera and speaking naturally.\n\
         CONTEXT: The character is speaking this line: \"{script}\".\n\
         {audio}",
        animation = scene.video_prompt,
        script = scene.script,
    )
}
