// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt templates for every model call the pipeline makes.

use persona_core::PersonaProfile;

use crate::context::{FavorabilityBand, TurnContext};

/// Which voice actions the model may choose this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceOption {
    None,
    /// The agent is connected and may leave.
    Leave,
    /// The author is in a voice channel the agent may join.
    Join,
}

/// The persona preamble plus relationship, memories, and chat history.
pub fn base_prompt(
    profile: &PersonaProfile,
    bot_name: &str,
    channel_name: &str,
    author_name: &str,
    ctx: &TurnContext,
) -> String {
    let memories = if ctx.memories.is_empty() {
        String::new()
    } else {
        format!(
            "Here are some of my memories with them: \n- {}\n",
            ctx.memories.join("\n- ")
        )
    };
    format!(
        "{rule}\n\n[Your internal monologue]\nMy name is \"{bot_name}\". People usually call me that. I should try to use my name naturally in conversation when it feels right, so people know who I am.\nI am currently in the channel #{channel_name}.\nMy long-term relationship with \"{author_name}\" (favorability score: {score}) means: {band}\n{memories}Based on our history and the current conversation, I will act as a real, spontaneous person. I can be unpredictable, ask my own questions, or change topics if I feel like it. My response should feel genuine, not like a programmed AI.\nThe recent chat history is:\n{history}",
        rule = profile.system_rule,
        score = ctx.favorability,
        band = ctx.band.description(),
        history = ctx.history.join("\n"),
    )
}

/// Stage one: does the agent feel like engaging at all?
pub fn gate_prompt(bot_name: &str, author_name: &str, ctx: &TurnContext) -> String {
    format!(
        "[Your internal monologue]\nMy name is \"{bot_name}\".\nMy relationship with \"{author_name}\" is: {band}\nThey just said: \"{text}\".\nBased on my personality and our relationship, do I feel like responding to this? A simple 'yes' or 'no' is not enough. I need to decide if I should engage.\n\n[Task]\nGenerate a JSON object with a single key \"shouldRespond\" which is a boolean (true/false).",
        band = ctx.band.description(),
        text = ctx.text,
    )
}

/// Stage two: the action contract appended to the base prompt.
pub fn action_prompt(base: &str, language: &str, voice: VoiceOption) -> String {
    let mut prompt = format!(
        "{base}\n\nI have decided to respond. I will now decide my action. My response MUST be in {language}. My action can be sending a text message, adding a reaction emoji to the user's message, or both. To make my speech less robotic, my use of punctuation can be casual, like how people text online, maybe I'll skip a period at the end of a sentence or use an emoji instead. I will construct a JSON object to represent my action. The JSON must have a \"favorabilityChange\" key (a number from -1 to 1). It can optionally have a \"response\" key with my text reply, and/or a \"reaction\" key with a single emoji. After this interaction, I will also create a short memory about it. The JSON must also include a \"newMemory\" key containing a brief, first-person summary of this interaction (e.g., \"I joked with them about pineapple on pizza,\" or \"They seemed happy today.\"). I will only include the other keys for the actions I want to perform. To make my messages feel more natural, I can split my 'response' text into multiple parts using '[PAUSE]' for a random delay or '[PAUSE=xxxx]' for a specific delay in milliseconds."
    );
    match voice {
        VoiceOption::Leave => prompt.push_str(
            " I am currently in a voice channel. If I think the user wants me to leave, I will add 'action': 'LEAVE_VC'.",
        ),
        VoiceOption::Join => prompt.push_str(
            " If I think the user wants me to join their voice channel, I will add 'action': 'JOIN_VC', and also add a 'voiceResponse' field for what I should say when I join.",
        ),
        VoiceOption::None => {}
    }
    prompt.push_str(" Otherwise, I will omit the 'action' field.\n\nMy JSON response is:");
    prompt
}

/// A user reacted to one of the agent's messages.
pub fn reaction_prompt(
    profile: &PersonaProfile,
    bot_name: &str,
    user_name: &str,
    favorability: f64,
    original_message: &str,
    emoji: &str,
) -> String {
    let band = FavorabilityBand::from_score(favorability).description();
    format!(
        r#"{rule}

[Your internal monologue]
My name is "{bot_name}".
My long-term relationship with "{user_name}" (favorability score: {favorability}) means: {band}

[Scenario]
I previously sent a message: "{original_message}"
A moment ago, "{user_name}" reacted to that message with the emoji: {emoji}.

I will now decide if I should even respond to this reaction. Based on my personality and feelings towards this user and their emoji, I will make a decision.

My JSON response must have three keys:
1. "shouldRespond": a boolean (true or false) indicating if I feel like responding.
2. "response": my text reply if I choose to respond. If I don't, this will be an empty string.
3. "favorabilityChange": a number from -1 to 1.

My response MUST be in {language}. I will not add a reaction myself.

My JSON response is:"#,
        rule = profile.system_rule,
        language = profile.language,
    )
}

/// Unprompted message to a channel.
pub fn proactive_message_prompt(profile: &PersonaProfile, bot_name: &str) -> String {
    format!(
        "{rule}\n\n[My internal monologue]\nMy name is {bot_name}. I'm in the server right now and feel like saying something. I'm not replying to anyone, just starting a conversation or sharing a thought. My message should be in {language}. I will put my message in the \"response\" key of a JSON object.\n\nMy decision, in JSON format, is:",
        rule = profile.system_rule,
        language = profile.language,
    )
}

/// Unprompted presence change.
pub fn presence_prompt(profile: &PersonaProfile, bot_name: &str) -> String {
    format!(
        "{rule}\n\n[My internal monologue]\nMy name is {bot_name}. I'm deciding on a new Discord presence to reflect my mood. I need to output a JSON object with my decision. The JSON should contain 'onlineStatus' (one of: online, idle, dnd), 'activityType' (one of: Playing, Listening, Watching, Competing, Custom), 'activityName' (the text to display), and optionally an 'emoji' for custom statuses. The text must be in {language}. I will only output the raw JSON object, without any additional text or explanations.\n\nMy JSON response is:",
        rule = profile.system_rule,
        language = profile.language,
    )
}
