use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};
use keyward_core::bootstrap::{BootstrapContext, CollectRequest, InputCollector};
use keyward_core::error::bootstrap::CollectError;
use keyward_core::validation::{require_non_empty, validate_email, validate_slug};

pub const MIN_PASSPHRASE_LENGTH: usize = 8;

/// Asks for account details on the terminal.
#[derive(Default)]
pub struct TerminalCollector {
    theme: ColorfulTheme,
}

impl TerminalCollector {
    fn ask(
        &self,
        prompt: &str,
        default: Option<&String>,
        validate: fn(&str) -> Result<(), String>,
    ) -> Result<String, dialoguer::Error> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .validate_with(|value: &String| validate(value));
        if let Some(default) = default {
            input = input.default(default.clone());
        }
        input.interact_text()
    }
}

fn check_passphrase(passphrase: &str) -> Result<(), String> {
    if passphrase.chars().count() < MIN_PASSPHRASE_LENGTH {
        return Err(format!(
            "Passphrase must be at least {} characters.",
            MIN_PASSPHRASE_LENGTH
        ));
    }
    Ok(())
}

impl InputCollector for TerminalCollector {
    fn collect(&mut self, request: &CollectRequest) -> Result<BootstrapContext, CollectError> {
        let full_name = self.ask("Full name", None, |v| {
            require_non_empty("full name", v).map_err(|e| e.to_string())
        })?;
        let username = self.ask("Username", None, |v| {
            validate_slug("username", v).map_err(|e| e.to_string())
        })?;
        let email = self.ask("Email", request.default_email.as_ref(), |v| {
            validate_email(v).map_err(|e| e.to_string())
        })?;
        let invite_code = if request.ask_invite_code {
            Some(self.ask(
                "Invite code",
                request.default_invite_code.as_ref(),
                |v| require_non_empty("invite code", v).map_err(|e| e.to_string()),
            )?)
        } else {
            None
        };

        let passphrase = Password::with_theme(&self.theme)
            .with_prompt("Passphrase")
            .with_confirmation("Confirm passphrase", "Passphrases do not match.")
            .validate_with(|value: &String| check_passphrase(value))
            .interact()?;

        Ok(BootstrapContext {
            full_name,
            username,
            email,
            invite_code,
            passphrase,
        })
    }
}
