//! Slider level to instruction fragment mapping.
//!
//! Each slider level falls into one of three tiers:
//!
//! | Levels | Tier |
//! |--------|------|
//! | 1-2    | [`Tier::Low`] |
//! | 3-5    | [`Tier::Moderate`] |
//! | 6-10   | [`Tier::High`] |
//!
//! The wording is part of the encoder's output contract. Changing any string
//! here changes every instruction payload, so bump [`PromptConfig::version`](crate::PromptConfig)
//! alongside it.
use ingest::ParameterField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Low,
    Moderate,
    High,
}

impl Tier {
    pub fn for_level(level: u8) -> Tier {
        match level {
            0..=2 => Tier::Low,
            3..=5 => Tier::Moderate,
            _ => Tier::High,
        }
    }
}

pub(crate) const PREAMBLE: &str =
    "Please process the following text according to these specific parameters:";
pub(crate) const TEXT_HEADING: &str = "**Text to process:**";
pub(crate) const CLOSING: &str = "**Instructions:** Apply the above parameters to rewrite this \
text. Return only the processed text without explanations.";

pub(crate) fn heading(field: ParameterField) -> &'static str {
    match field {
        ParameterField::Faithfulness => "Faithfulness to Original",
        ParameterField::HumanLike => "Human-like Sound",
        ParameterField::AiLike => "AI-like Sound",
        ParameterField::Formality => "Formality Level",
    }
}

/// Instruction sentence for a slider at the given tier.
pub fn fragment(field: ParameterField, tier: Tier) -> &'static str {
    use ParameterField::*;
    use Tier::*;

    match (field, tier) {
        (Faithfulness, Low) => {
            "Make significant changes and improvements to the content while preserving core meaning."
        }
        (Faithfulness, Moderate) => {
            "Make moderate changes to improve clarity and flow while keeping most original content."
        }
        (Faithfulness, High) => {
            "Make minimal changes, focusing only on essential corrections and improvements."
        }
        (HumanLike, Low) => {
            "Use very natural, conversational language with contractions and casual expressions."
        }
        (HumanLike, Moderate) => "Use moderately natural language that sounds human but polished.",
        (HumanLike, High) => {
            "Use highly natural, warm, and engaging human language with personality."
        }
        (AiLike, Low) => "Avoid any mechanical or robotic phrasing; sound completely human.",
        (AiLike, Moderate) => "Use some structured phrasing but maintain natural flow.",
        (AiLike, High) => {
            "Use precise, structured language that sounds more systematic and analytical."
        }
        (Formality, Low) => {
            "Use very casual, informal language appropriate for friends or social media."
        }
        (Formality, Moderate) => {
            "Use moderately formal language suitable for business communication."
        }
        (Formality, High) => "Use highly formal, academic or professional language.",
    }
}
