use crate::error::{GenError, GenResult};
use crate::media::MediaRole;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Field names the planning call must return for every ad scene.
pub const SCENE_FIELDS: [&str; 7] = [
    "title",
    "description",
    "script",
    "image_prompt",
    "video_prompt",
    "overlay_text",
    "caption",
];

/// Field names the branding planning call is asked to return.
pub const BRANDING_FIELDS: [&str; 3] = ["script", "image_prompt", "overlay"];

/// Fields that must be non-empty on every branding scene. Script and
/// overlay may come back empty; only the image prompt is load-bearing
/// downstream.
pub const BRANDING_REQUIRED_FIELDS: [&str; 1] = ["image_prompt"];

/// Inputs for one planning run.
#[derive(Debug, Clone)]
pub struct PlanParams {
    pub product_name: String,
    /// Free-form extra direction; empty means none.
    pub brief: String,
    pub scene_count: usize,
    /// Call to action in every scene, or only in the final one.
    pub cta_per_scene: bool,
}

/// A narrative storyboard shape the planner can be asked to follow.
#[derive(Debug)]
pub struct SceneTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub required_roles: &'static [MediaRole],
    sales: bool,
    headline: &'static str,
    skeleton: &'static str,
}

impl SceneTemplate {
    /// The exact text sent to the planning call. Deterministic in the
    /// params; embeds the requested scene count and the product name.
    pub fn planning_prompt(&self, params: &PlanParams) -> String {
        let product = params.product_name.as_str();
        // Soft-sell templates never push a per-scene CTA.
        let cta_per_scene = self.sales && params.cta_per_scene;

        let mut prompt = String::new();
        prompt.push_str(&self.headline.replace("{product}", product));
        prompt.push('\n');
        prompt.push_str(&common_rules(cta_per_scene, self.sales, product));
        prompt.push_str("\nStructure:\n");
        prompt.push_str(&self.skeleton.replace("{product}", product));
        prompt.push('\n');
        if !params.brief.is_empty() {
            prompt.push_str(&format!("Extra direction: {}\n", params.brief));
        }
        prompt.push_str(&output_format(params.scene_count, product));
        prompt
    }
}

fn common_rules(cta_per_scene: bool, sales: bool, product_name: &str) -> String {
    let register = if sales { "HARD SELL MODE" } else { "STORY MODE" };
    let mention_scope = if sales {
        "in EVERY scene"
    } else {
        "where it fits the story"
    };
    let length_rule = if sales {
        "at most 15 words per scene, fast and punchy"
    } else {
        "at most 30 words per scene, narrative pace"
    };
    let cta_rule = if cta_per_scene {
        "every scene must contain a call to action (check the cart, tap here)"
    } else {
        "only the FINAL scene carries the call to action"
    };
    let caption_rule = if cta_per_scene {
        "at most 2 short sentences per scene plus 3-5 relevant hashtags"
    } else {
        "only the FINAL scene gets a caption; leave it empty for the others"
    };

    format!(
        "YOUR ROLE: consistency director and senior sales copywriter.\n\n\
         MANDATORY VISUAL RULES (CRITICAL):\n\
         1. STRICT IDENTITY: the person in every generated image MUST look exactly like the person in the provided [Model Image].\n\
         2. PRODUCT ISOLATION: focus ONLY on the object \"{product_name}\" from the [Product Image]. IGNORE any human, body parts, or clothing visible in the original [Product Image]; take the item only.\n\
         3. COMPOSITION: combine the face and body from [Model Image] with the object from [Product Image].\n\
         4. FRAMING: a vertical 9:16 portrait photo, subject centered with headroom for vertical cropping.\n\
         5. PHOTOREALISM: every image prompt must start with \"A photorealistic shot of [Model]...\".\n\n\
         VOICE-OVER RULES ({register}):\n\
         - Tone: natural, energetic, persuasive.\n\
         - Mention the product \"{product_name}\" or its main benefit {mention_scope}.\n\
         - Open with a short exclamation hook.\n\
         - No filler sentences; go straight to the point.\n\
         - Length: {length_rule}.\n\
         - CTA: {cta_rule}.\n\n\
         CAPTION & HASHTAG RULES:\n\
         - The caption MUST name the product \"{product_name}\" explicitly.\n\
         - Explain one main benefit of the product in an engaging sentence.\n\
         - Format: {caption_rule}.\n"
    )
}

fn output_format(scene_count: usize, product_name: &str) -> String {
    format!(
        "Return valid JSON with a \"scenes\" key holding an array of exactly {scene_count} objects.\n\
         Every object MUST have:\n\
         1. \"title\": the scene heading.\n\
         2. \"description\": how the scene plays out.\n\
         3. \"script\": the voice-over line. MUST mention \"{product_name}\" or its benefit plus a hook. Max 15 words (sales) / 30 words (story).\n\
         4. \"image_prompt\": the visual prompt in English.\n\
            - START WITH: \"A photorealistic vertical 9:16 portrait shot of...\"\n\
            - INCLUDE: \"[Model description] holding/using [{product_name} object]\".\n\
            - MANDATORY: \"Ignore human in product image, use input model face. Seamless integration.\"\n\
         5. \"video_prompt\": the animation instruction (for example \"model points at the cart\", \"zoom in on the texture\").\n\
         6. \"overlay_text\": short, punchy on-screen text.\n\
         7. \"caption\": the social caption naming \"{product_name}\" plus hashtags.\n"
    )
}

const PRODUCT_AND_MODEL: &[MediaRole] = &[MediaRole::Product, MediaRole::Model];
const MODEL_ONLY: &[MediaRole] = &[MediaRole::Model];

pub static SCENE_TEMPLATES: &[SceneTemplate] = &[
    SceneTemplate {
        id: "problem-solution",
        name: "Problem / Solution (General Sales)",
        description: "Classic marketing funnel: hook, problem, solution, CTA.",
        required_roles: PRODUCT_AND_MODEL,
        sales: true,
        headline: "Create a vertical ad storyboard for \"{product}\".",
        skeleton: "- Opening scene: a frustrating everyday problem (hook).\n\
                   - Middle scenes: \"{product}\" appears as the instant fix (benefit).\n\
                   - Final scene: the visible result and the happy payoff of \"{product}\" (CTA).",
    },
    SceneTemplate {
        id: "shoes-footwear",
        name: "Shoes / Footwear (Sales)",
        description: "Dynamic shots, walking, focus on design and comfort.",
        required_roles: PRODUCT_AND_MODEL,
        sales: true,
        headline: "Create a SHOES/FOOTWEAR ad storyboard for \"{product}\".",
        skeleton: "- Scene 1: low angle shot, feet mid-stride (hook).\n\
                   - Scene 2: close up on the material and design details of \"{product}\" (benefit).\n\
                   - Scene 3: full body shot, styled with the outfit (benefit).\n\
                   - Scene 4: model holds the shoes or points at their feet (CTA).",
    },
    SceneTemplate {
        id: "herbal-wellness",
        name: "Herbal / Vitamins / Wellness",
        description: "Trust, health, purity, glowing skin, consumption.",
        required_roles: PRODUCT_AND_MODEL,
        sales: true,
        headline: "Create a WELLNESS/HERBAL ad storyboard for \"{product}\".",
        skeleton: "- Scene 1: model looks drained or holds the aching spot (hook).\n\
                   - Scene 2: taking \"{product}\", a sip or an application (solution).\n\
                   - Scene 3: the visible health payoff, glowing and fresh thanks to \"{product}\" (benefit).\n\
                   - Scene 4: model smiles holding the bottle (trust and CTA).",
    },
    SceneTemplate {
        id: "equipment-tools",
        name: "Equipment / Tools / Gadget",
        description: "Durability, usage demonstration, rugged or tech vibe.",
        required_roles: PRODUCT_AND_MODEL,
        sales: true,
        headline: "Create an EQUIPMENT/TOOLS ad storyboard for \"{product}\".",
        skeleton: "- Scene 1: the heavy chore or challenge (hook).\n\
                   - Scene 2: demo of \"{product}\" in action, close up on the mechanism (benefit).\n\
                   - Scene 3: the quick, tidy result thanks to \"{product}\".\n\
                   - Scene 4: satisfied model gives a thumbs up with the tool (CTA).",
    },
    SceneTemplate {
        id: "fashion-bags",
        name: "Bags / Fashion Accessories",
        description: "Focus on texture, straps and zips, outfit matching.",
        required_roles: PRODUCT_AND_MODEL,
        sales: true,
        headline: "Create a BAGS/ACCESSORIES ad storyboard for \"{product}\".",
        skeleton: "- Scene 1: model walks or poses, the \"{product}\" bag front and center (hook).\n\
                   - Scene 2: close up on the texture, zips and stitching of \"{product}\" (benefit).\n\
                   - Scene 3: model opens the bag and pulls something out (benefit: fits a lot).\n\
                   - Scene 4: aesthetic pose hugging or holding the bag (CTA).",
    },
    SceneTemplate {
        id: "automotive",
        name: "Automotive (Product / Vehicle)",
        description: "Sleek lines, motion blur, driving, interior and exterior.",
        required_roles: PRODUCT_AND_MODEL,
        sales: true,
        headline: "Create an AUTOMOTIVE ad storyboard for \"{product}\".",
        skeleton: "- Scene 1: gleaming exterior shot of \"{product}\" (hook).\n\
                   - Scene 2: model interacts with \"{product}\", opening the door, at the wheel, or pouring it in.\n\
                   - Scene 3: the driving or usage sensation (benefit).\n\
                   - Scene 4: shot with the model beside the vehicle or product (CTA).",
    },
    SceneTemplate {
        id: "food-beverage",
        name: "Food / Beverage",
        description: "Appetite appeal, eating shots, texture.",
        required_roles: PRODUCT_AND_MODEL,
        sales: true,
        headline: "Create a FOOD/BEVERAGE ad storyboard for \"{product}\".",
        skeleton: "- Scene 1: appetite shot, steam, melt or freshness, close up on \"{product}\" (hook).\n\
                   - Scene 2: model takes a delighted bite or sip of \"{product}\".\n\
                   - Scene 3: wide-eyed reaction (benefit).\n\
                   - Scene 4: product on the table, the model's hand reaching for more (CTA).",
    },
    SceneTemplate {
        id: "fashion-lifestyle",
        name: "Fashion / Lifestyle (General)",
        description: "Aesthetic, vibe, outfit of the day, cinematic transitions.",
        required_roles: PRODUCT_AND_MODEL,
        sales: true,
        headline: "Create a FASHION LIFESTYLE ad storyboard for \"{product}\".",
        skeleton: "- Scene 1: outfit-check transition wearing \"{product}\" (hook).\n\
                   - Scene 2: fabric and pattern details of \"{product}\" (benefit).\n\
                   - Scene 3: movement, spinning or walking (benefit).\n\
                   - Scene 4: confident closing pose (CTA).",
    },
    SceneTemplate {
        id: "unboxing",
        name: "Unboxing (Sales)",
        description: "Excitement of opening, first impressions.",
        required_roles: PRODUCT_AND_MODEL,
        sales: true,
        headline: "Create an UNBOXING storyboard for \"{product}\".",
        skeleton: "- Scene 1: the \"{product}\" parcel on the table or handed over by the courier (hook).\n\
                   - Scene 2: the unboxing itself, POV or a hands-only shot.\n\
                   - Scene 3: \"{product}\" revealed (wow factor).\n\
                   - Scene 4: model shows the product off to the camera (CTA).",
    },
    SceneTemplate {
        id: "digital-service",
        name: "Digital Product / Service",
        description: "Apps, websites, courses, e-books.",
        required_roles: PRODUCT_AND_MODEL,
        sales: true,
        headline: "Create a DIGITAL PRODUCT ad storyboard for \"{product}\".",
        skeleton: "- Scene 1: the clumsy workflow without the tool (hook).\n\
                   - Scene 2: model scrolls a phone or laptop and finds \"{product}\".\n\
                   - Scene 3: the screen shows the \"{product}\" interface or dashboard (benefit).\n\
                   - Scene 4: relieved model smiles at the camera (CTA).",
    },
    SceneTemplate {
        id: "storytelling-camera",
        name: "Storytelling (On Camera)",
        description: "Personal experience, emotional connection. Max 30 words per scene.",
        required_roles: MODEL_ONLY,
        sales: false,
        headline: "Create a PERSONAL STORYTELLING storyboard about \"{product}\".",
        skeleton: "- Scene 1: an emotional, vulnerable hook.\n\
                   - Scene 2: the journey and the struggle.\n\
                   - Scene 3: the realization, the turning point.\n\
                   - Scene 4: invite viewers to share their own story in the comments.",
    },
    SceneTemplate {
        id: "talking-head-awareness",
        name: "Talking Head (Opinion / Education)",
        description: "Thought leadership, educational, sharing a take. Max 30 words per scene.",
        required_roles: MODEL_ONLY,
        sales: false,
        headline: "Create a TALKING HEAD / EDUCATION storyboard about \"{product}\".",
        skeleton: "- Scene 1: a bold fact or contrarian take (hook).\n\
                   - Scene 2: the explanation, the argument.\n\
                   - Scene 3: the key insight.\n\
                   - Scene 4: a question back to the audience.",
    },
];

static TEMPLATE_INDEX: Lazy<HashMap<&'static str, &'static SceneTemplate>> = Lazy::new(|| {
    SCENE_TEMPLATES
        .iter()
        .map(|template| (template.id, template))
        .collect()
});

pub fn find_template(id: &str) -> Option<&'static SceneTemplate> {
    TEMPLATE_INDEX.get(id).copied()
}

/// Build the planning prompt for a registered template.
pub fn compose_planning_prompt(template_id: &str, params: &PlanParams) -> GenResult<String> {
    if params.scene_count == 0 {
        return Err(GenError::config("scene_count must be at least 1"));
    }
    let template = find_template(template_id)
        .ok_or_else(|| GenError::UnknownTemplate(template_id.to_string()))?;
    Ok(template.planning_prompt(params))
}

/// Inputs for a personal-branding planning run.
#[derive(Debug, Clone)]
pub struct BrandingParams {
    /// Audience comments pulled from earlier posts.
    pub comments: String,
    /// A script whose hook, structure and delivery should be imitated.
    pub reference_script: String,
    pub brief: String,
    pub scene_count: usize,
}

/// Build the planning prompt for a personal-branding package.
pub fn compose_branding_prompt(params: &BrandingParams) -> GenResult<String> {
    if params.scene_count == 0 {
        return Err(GenError::config("scene_count must be at least 1"));
    }
    let brief = if params.brief.is_empty() {
        "none"
    } else {
        params.brief.as_str()
    };
    Ok(format!(
        "You are a social media content strategist specializing in personal branding.\n\
         Study this reference script for its hook, structure, tone of voice and delivery: \"{reference}\".\n\
         Study these comments from earlier posts for the audience's questions, problems and interests: \"{comments}\".\n\
         Based on that analysis, and following this extra direction ({brief}), create content for a talking-head style video with {count} scenes.\n\
         The goal is to build the personal brand and engage the audience on their own input.\n\n\
         IMPORTANT RULES:\n\
         1. FORMAT: every image_prompt must ask for a \"Vertical 9:16 portrait photo\".\n\
         2. CONSISTENCY: the person must look the same across scenes.\n\
         3. SCRIPT: short and dense, at most 30 words per scene.\n\n\
         Return a valid JSON object with exactly one key, \"scenes\", holding an array of {count} objects.\n\
         Every object must have three STRING keys:\n\
         1. \"script\": a short, engaging voice-over line (at most 30 words).\n\
         2. \"image_prompt\": a highly detailed visual prompt for an AI image generator (9:16 portrait). Describe the person's expression, pose and backdrop clearly. Do not ask for any text or logo in the image. Start with \"A vertical 9:16 portrait of...\" and add \"NO TEXT, NO WATERMARK\".\n\
         3. \"overlay\": a casual, natural on-screen text suggestion that works as a hook or key point (one short sentence).",
        reference = params.reference_script,
        comments = params.comments,
        brief = brief,
        count = params.scene_count,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(count: usize, cta: bool) -> PlanParams {
        PlanParams {
            product_name: "Kopi Segar".to_string(),
            brief: String::new(),
            scene_count: count,
            cta_per_scene: cta,
        }
    }

    #[test]
    fn registry_holds_all_twelve_templates() {
        assert_eq!(SCENE_TEMPLATES.len(), 12);
        for template in SCENE_TEMPLATES {
            assert!(find_template(template.id).is_some());
            assert!(!template.required_roles.is_empty());
        }
        assert!(find_template("talking-head-awareness")
            .unwrap()
            .required_roles
            .iter()
            .all(|r| *r == MediaRole::Model));
    }

    #[test]
    fn prompt_embeds_product_name_and_scene_count() {
        let prompt = compose_planning_prompt("problem-solution", &params(4, true)).unwrap();
        assert!(prompt.contains("Kopi Segar"));
        assert!(prompt.contains("array of exactly 4 objects"));
        for field in SCENE_FIELDS {
            assert!(prompt.contains(&format!("\"{field}\"")), "missing {field}");
        }
    }

    #[test]
    fn every_template_embeds_the_requested_count() {
        for template in SCENE_TEMPLATES {
            for count in [1usize, 4, 7] {
                let prompt = compose_planning_prompt(template.id, &params(count, true)).unwrap();
                assert!(
                    prompt.contains(&format!("array of exactly {count} objects")),
                    "{} does not embed the count",
                    template.id
                );
                assert!(prompt.contains("Kopi Segar"));
            }
        }
    }

    #[test]
    fn cta_flag_switches_the_placement_rule() {
        let every = compose_planning_prompt("problem-solution", &params(3, true)).unwrap();
        assert!(every.contains("every scene must contain a call to action"));

        let last = compose_planning_prompt("problem-solution", &params(3, false)).unwrap();
        assert!(last.contains("only the FINAL scene carries the call to action"));
    }

    #[test]
    fn soft_sell_templates_ignore_the_cta_flag() {
        let prompt = compose_planning_prompt("storytelling-camera", &params(4, true)).unwrap();
        assert!(prompt.contains("only the FINAL scene carries the call to action"));
        assert!(prompt.contains("STORY MODE"));
        assert!(prompt.contains("at most 30 words per scene"));
    }

    #[test]
    fn unknown_template_is_rejected() {
        let err = compose_planning_prompt("does-not-exist", &params(4, true)).unwrap_err();
        assert!(matches!(err, GenError::UnknownTemplate(id) if id == "does-not-exist"));
    }

    #[test]
    fn zero_scene_count_is_rejected() {
        let err = compose_planning_prompt("unboxing", &params(0, false)).unwrap_err();
        assert!(err.to_string().contains("scene_count"));
    }

    #[test]
    fn brief_is_appended_only_when_present() {
        let without = compose_planning_prompt("food-beverage", &params(2, false)).unwrap();
        assert!(!without.contains("Extra direction:"));

        let mut with_brief = params(2, false);
        with_brief.brief = "shoot it at a night market".to_string();
        let prompt = compose_planning_prompt("food-beverage", &with_brief).unwrap();
        assert!(prompt.contains("Extra direction: shoot it at a night market"));
    }

    #[test]
    fn branding_prompt_embeds_inputs_and_count() {
        let prompt = compose_branding_prompt(&BrandingParams {
            comments: "how do you stay consistent?".to_string(),
            reference_script: "nobody talks about this".to_string(),
            brief: String::new(),
            scene_count: 3,
        })
        .unwrap();
        assert!(prompt.contains("how do you stay consistent?"));
        assert!(prompt.contains("nobody talks about this"));
        assert!(prompt.contains("array of 3 objects"));
        assert!(prompt.contains("(none)"));
        assert!(prompt.contains("\"overlay\""));
    }
}
