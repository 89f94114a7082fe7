use colloquy_core::Tone;

/// Builds the text sent to the model: tone instruction, prior context, then
/// the new input, separated by blank lines. Empty sections are omitted.
pub fn compose_prompt(context: &str, user_input: &str, tone: Tone) -> String {
    let sections = [tone.instruction().unwrap_or_default(), context.trim(), user_input];
    sections
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n\n")
}
