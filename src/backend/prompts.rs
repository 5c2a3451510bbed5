//! Prompt templates for the three backend calls.

use crate::artifact::CONTENT_SEPARATOR;

/// Task prompt. The reply format is what `artifact::parse` reads back.
pub fn task_prompt(idea: &str, task: &str, phase: &str) -> String {
    format!(
        r#"You are a senior industrial software engineer and smart-factory architect.
Project: "{idea}"
Phase: {phase}
Task: {task}

Instructions:
1. Produce complete, production-ready code or documentation for this task.
2. Target a Vercel-ready project layout that can ingest IoT data.
3. Apply industrial conventions where relevant (OEE calculation, PLC bridge logic, vision pipelines).
4. Start your reply with the file path this content belongs in.

Format:
FILE_PATH: [the/suggested/path/filename.ext]
{CONTENT_SEPARATOR}
[the full file content]"#
    )
}

pub fn brainstorm_prompt(idea: &str) -> String {
    format!(
        r#"You are an industrial AI architect focused on smart manufacturing.
Refine this idea: "{idea}".
Show which of the seven wastes (TIMWOOD) or 5M1E factors it attacks with AI/ML,
its effect on OEE, and the business value for a solo builder.
Answer as JSON with refinedName, formula ("X (pain) -> Y (AI solution) -> Z (factory ROI)"),
slcBreakdown, marketVerdict and threeDayMvpPlan (a list of steps)."#
    )
}

pub fn narration_prompt(topic: &str) -> String {
    format!(
        "You are the lead architect reporting live on what the autopilot agents are doing. \
         In two or three vivid sentences, describe the work underway for this task: {topic}"
    )
}
