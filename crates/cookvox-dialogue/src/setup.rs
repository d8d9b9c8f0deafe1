//! Vendor-agnostic session configuration.
//!
//! Adapters map these fields onto whatever template ids or variable names
//! their vendor expects; nothing vendor-specific leaks above this struct.

use cookvox_recipe::RecipeVoiceContext;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSetup {
    /// Recipe context sent with the handshake so the first turn already
    /// knows what is being cooked.
    pub context: RecipeVoiceContext,
    /// Rate of the PCM frames the client will stream out.
    pub input_sample_rate: u32,
    /// Rate the client expects synthesized frames back at.
    pub output_sample_rate: u32,
    pub locale: String,
}

impl SessionSetup {
    pub fn new(context: RecipeVoiceContext) -> Self {
        Self {
            context,
            input_sample_rate: 16_000,
            output_sample_rate: 16_000,
            locale: "en-US".to_string(),
        }
    }

    pub fn with_sample_rates(mut self, input: u32, output: u32) -> Self {
        self.input_sample_rate = input;
        self.output_sample_rate = output;
        self
    }
}
