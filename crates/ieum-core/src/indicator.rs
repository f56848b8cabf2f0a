//! Wellbeing indicators scored in weekly and monthly reports.
//!
//! Each [`IndicatorKind`] owns its own closed value set. A value token that
//! belongs to one kind is never accepted for another; validation dispatches
//! on the kind and yields a typed [`IndicatorValue`].

use serde::{Deserialize, Serialize};

/// Declares a per-kind value enum with its wire tokens.
macro_rules! indicator_values {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $token)]
                $variant,
            )+
        }

        impl $name {
            /// Every valid value, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire token for this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $token,)+
                }
            }

            /// Parse an exact wire token.
            pub fn parse(token: &str) -> Option<Self> {
                match token {
                    $($token => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

indicator_values!(
    /// Level of daily physical activity.
    ActivityLevel {
        Excellent => "EXCELLENT",
        Good => "GOOD",
        Fair => "FAIR",
        Poor => "POOR",
        VeryPoor => "VERY_POOR",
    }
);

indicator_values!(
    /// Self-reported and observed physical health.
    HealthStatus {
        Excellent => "EXCELLENT",
        Good => "GOOD",
        Fair => "FAIR",
        Poor => "POOR",
        VeryPoor => "VERY_POOR",
    }
);

indicator_values!(
    /// Memory, orientation and conversational coherence.
    CognitiveFunction {
        Normal => "NORMAL",
        MildDecline => "MILD_DECLINE",
        ModerateDecline => "MODERATE_DECLINE",
        SevereDecline => "SEVERE_DECLINE",
    }
);

indicator_values!(
    LifeSatisfaction {
        VerySatisfied => "VERY_SATISFIED",
        Satisfied => "SATISFIED",
        Neutral => "NEUTRAL",
        Dissatisfied => "DISSATISFIED",
        VeryDissatisfied => "VERY_DISSATISFIED",
    }
);

indicator_values!(
    PsychologicalStability {
        VeryStable => "VERY_STABLE",
        Stable => "STABLE",
        Neutral => "NEUTRAL",
        Unstable => "UNSTABLE",
        VeryUnstable => "VERY_UNSTABLE",
    }
);

indicator_values!(
    /// Frequency and quality of contact with family, friends and community.
    SocialConnectivity {
        VeryHigh => "VERY_HIGH",
        High => "HIGH",
        Moderate => "MODERATE",
        Low => "LOW",
        VeryLow => "VERY_LOW",
    }
);

indicator_values!(
    /// How much caregiver intervention the elderly person currently needs.
    SupportNeeds {
        NotNeeded => "NONE",
        Low => "LOW",
        Moderate => "MODERATE",
        High => "HIGH",
        Urgent => "URGENT",
    }
);

/// The fixed set of wellbeing dimensions scored per report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    ActivityLevel,
    HealthStatus,
    CognitiveFunction,
    LifeSatisfaction,
    PsychologicalStability,
    SocialConnectivity,
    SupportNeeds,
}

impl IndicatorKind {
    /// All kinds, in report order.
    pub const ALL: [IndicatorKind; 7] = [
        IndicatorKind::ActivityLevel,
        IndicatorKind::HealthStatus,
        IndicatorKind::CognitiveFunction,
        IndicatorKind::LifeSatisfaction,
        IndicatorKind::PsychologicalStability,
        IndicatorKind::SocialConnectivity,
        IndicatorKind::SupportNeeds,
    ];

    /// Name the analysis assistant uses for this indicator in its headings.
    pub fn analysis_key(&self) -> &'static str {
        match self {
            IndicatorKind::ActivityLevel => "ActivityLevelIndicator",
            IndicatorKind::HealthStatus => "HealthStatusIndicator",
            IndicatorKind::CognitiveFunction => "CognitiveFunctionIndicator",
            IndicatorKind::LifeSatisfaction => "LifeSatisfactionIndicator",
            IndicatorKind::PsychologicalStability => "PsychologicalStabilityIndicator",
            IndicatorKind::SocialConnectivity => "SocialConnectivityIndicator",
            IndicatorKind::SupportNeeds => "SupportNeedsIndicator",
        }
    }

    /// Validate a value token against this kind's value set.
    ///
    /// Surrounding whitespace is ignored; matching is otherwise exact.
    pub fn parse_value(&self, token: &str) -> Option<IndicatorValue> {
        let token = token.trim();
        match self {
            IndicatorKind::ActivityLevel => {
                ActivityLevel::parse(token).map(IndicatorValue::ActivityLevel)
            }
            IndicatorKind::HealthStatus => {
                HealthStatus::parse(token).map(IndicatorValue::HealthStatus)
            }
            IndicatorKind::CognitiveFunction => {
                CognitiveFunction::parse(token).map(IndicatorValue::CognitiveFunction)
            }
            IndicatorKind::LifeSatisfaction => {
                LifeSatisfaction::parse(token).map(IndicatorValue::LifeSatisfaction)
            }
            IndicatorKind::PsychologicalStability => {
                PsychologicalStability::parse(token).map(IndicatorValue::PsychologicalStability)
            }
            IndicatorKind::SocialConnectivity => {
                SocialConnectivity::parse(token).map(IndicatorValue::SocialConnectivity)
            }
            IndicatorKind::SupportNeeds => {
                SupportNeeds::parse(token).map(IndicatorValue::SupportNeeds)
            }
        }
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.analysis_key())
    }
}

/// A validated indicator value, tagged with the kind it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorValue {
    ActivityLevel(ActivityLevel),
    HealthStatus(HealthStatus),
    CognitiveFunction(CognitiveFunction),
    LifeSatisfaction(LifeSatisfaction),
    PsychologicalStability(PsychologicalStability),
    SocialConnectivity(SocialConnectivity),
    SupportNeeds(SupportNeeds),
}

impl IndicatorValue {
    /// The kind this value belongs to.
    pub fn kind(&self) -> IndicatorKind {
        match self {
            IndicatorValue::ActivityLevel(_) => IndicatorKind::ActivityLevel,
            IndicatorValue::HealthStatus(_) => IndicatorKind::HealthStatus,
            IndicatorValue::CognitiveFunction(_) => IndicatorKind::CognitiveFunction,
            IndicatorValue::LifeSatisfaction(_) => IndicatorKind::LifeSatisfaction,
            IndicatorValue::PsychologicalStability(_) => IndicatorKind::PsychologicalStability,
            IndicatorValue::SocialConnectivity(_) => IndicatorKind::SocialConnectivity,
            IndicatorValue::SupportNeeds(_) => IndicatorKind::SupportNeeds,
        }
    }

    /// Wire token of the inner value.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorValue::ActivityLevel(v) => v.as_str(),
            IndicatorValue::HealthStatus(v) => v.as_str(),
            IndicatorValue::CognitiveFunction(v) => v.as_str(),
            IndicatorValue::LifeSatisfaction(v) => v.as_str(),
            IndicatorValue::PsychologicalStability(v) => v.as_str(),
            IndicatorValue::SocialConnectivity(v) => v.as_str(),
            IndicatorValue::SupportNeeds(v) => v.as_str(),
        }
    }
}

/// Unvalidated `(value, reason)` pair extracted from analysis text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub value: String,
    pub reason: String,
}

impl IndicatorResult {
    pub fn new(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            reason: reason.into(),
        }
    }
}
