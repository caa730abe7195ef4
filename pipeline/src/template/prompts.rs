//! Built-in prompt templates and duration-dependent wording.

/// Slide deck prompt. Placeholders: `topic` (display label), `level`,
/// `duration`, `industry`, `total_slides`, `opening_slides`, `core_slides`,
/// `closing_slides`, `depth_instruction`.
pub const PRESENTATION_TEMPLATE: &str = include_str!("../../templates/presentation.md");

/// Instructor guide prompt. Adds `slides_content` to the presentation
/// variables.
pub const INSTRUCTOR_GUIDE_TEMPLATE: &str = include_str!("../../templates/instructor_guide.md");

const OVERVIEW_DEPTH: &str = "Focus on a high-level overview. The content should be concise, \
     covering only the most critical points and key takeaways. Prioritize breadth over depth.";

const BALANCED_DEPTH: &str = "Provide a balanced level of detail. Explain core concepts clearly \
     and provide one or two illustrative examples for each key point.";

const COMPREHENSIVE_DEPTH: &str = "This is a comprehensive training. Deliver in-depth content for \
     each topic. Include detailed explanations, multiple examples, case studies, and practical \
     application steps.";

pub fn depth_instruction(duration: u32) -> &'static str {
    if duration < 60 {
        OVERVIEW_DEPTH
    } else if duration <= 120 {
        BALANCED_DEPTH
    } else {
        COMPREHENSIVE_DEPTH
    }
}
