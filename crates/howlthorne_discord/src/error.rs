use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DiscordError {
    #[error("Discord client could not be created")]
    #[diagnostic(
        code(howlthorne::discord::client_build_failed),
        help("Check that your Discord bot token is valid and has not been regenerated")
    )]
    ClientBuildFailed {
        #[source]
        cause: serenity::Error,
        token_preview: String, // First/last few chars of token for debugging
    },

    #[error("Discord gateway connection failed")]
    #[diagnostic(
        code(howlthorne::discord::gateway_failed),
        help("The bot lost its gateway session and could not recover; check the token and the MESSAGE_CONTENT intent")
    )]
    GatewayFailed {
        #[source]
        cause: serenity::Error,
    },

    #[error("Channel not found")]
    #[diagnostic(
        code(howlthorne::discord::channel_not_found),
        help("Channel ID {channel_id} not found or bot doesn't have access")
    )]
    ChannelNotFound {
        channel_id: u64,
        #[source]
        cause: Option<serenity::Error>,
    },

    #[error("User not found")]
    #[diagnostic(
        code(howlthorne::discord::user_not_found),
        help("User ID {user_id} could not be fetched after {attempts} attempt(s)")
    )]
    UserNotFound {
        user_id: u64,
        attempts: u32,
        #[source]
        cause: Option<serenity::Error>,
    },

    #[error("Message not found")]
    #[diagnostic(
        code(howlthorne::discord::message_not_found),
        help("Message {message_id} no longer exists in channel {channel_id}; it will be re-sent")
    )]
    MessageNotFound {
        channel_id: u64,
        message_id: u64,
        #[source]
        cause: serenity::Error,
    },

    #[error("Message send failed")]
    #[diagnostic(
        code(howlthorne::discord::message_send_failed),
        help("Failed to send message to {destination}")
    )]
    MessageSendFailed {
        destination: String,
        #[source]
        cause: serenity::Error,
    },

    #[error("Discord call timed out")]
    #[diagnostic(
        code(howlthorne::discord::timeout),
        help("`{operation}` did not finish within {timeout:?}; Discord may be degraded")
    )]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Discord request failed")]
    #[diagnostic(
        code(howlthorne::discord::transient_network),
        help("`{operation}` failed; this is usually transient")
    )]
    TransientNetwork {
        operation: &'static str,
        #[source]
        cause: serenity::Error,
    },

    #[error("Permission denied")]
    #[diagnostic(
        code(howlthorne::discord::permission_denied),
        help("User {user_id} lacks '{required_permission}' for `{command}`")
    )]
    PermissionDenied {
        user_id: u64,
        command: String,
        required_permission: String,
    },

    #[error("Invalid command syntax")]
    #[diagnostic(
        code(howlthorne::discord::invalid_command_syntax),
        help("Expected: {expected_format}")
    )]
    InvalidCommandSyntax {
        command: String,
        expected_format: String,
        #[source_code]
        provided_input: String,
        #[label("error here")]
        error_span: (usize, usize),
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] howlthorne_core::CoreError),
}

pub type Result<T> = std::result::Result<T, DiscordError>;

// Helper functions for creating common errors
impl DiscordError {
    pub fn client_build_failed(cause: serenity::Error, token: &str) -> Self {
        // Show first 6 and last 4 characters of token for debugging
        let token_preview = if token.len() > 10 && token.is_ascii() {
            format!("{}...{}", &token[..6], &token[token.len() - 4..])
        } else {
            "***".to_string()
        };

        Self::ClientBuildFailed {
            cause,
            token_preview,
        }
    }

    pub fn invalid_command(
        command: impl Into<String>,
        input: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        let input = input.into();

        // Everything after the command word is suspect
        let error_span = if let Some(pos) = input.find(' ') {
            (pos, input.len() - pos)
        } else {
            (0, input.len())
        };

        Self::InvalidCommandSyntax {
            command: command.into(),
            expected_format: expected.into(),
            provided_input: input,
            error_span,
        }
    }

    /// Failures worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::TransientNetwork { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ChannelNotFound { .. } | Self::UserNotFound { .. } | Self::MessageNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Report;

    #[test]
    fn test_client_error_hides_token() {
        let error = DiscordError::client_build_failed(
            serenity::Error::Other("test"),
            "MTE2MzU5NzE0MjQ5NzI1NTQyNA.GqvKfH.verysecrettoken",
        );

        if let DiscordError::ClientBuildFailed { token_preview, .. } = &error {
            assert_eq!(token_preview, "MTE2Mz...oken");
            assert!(!token_preview.contains("secret"));
        }
    }

    #[test]
    fn test_invalid_command_report_points_at_arguments() {
        let error = DiscordError::invalid_command(
            "givepoints",
            "!givepoints <@1> 9 alchemy 5",
            "!givepoints @user <slot 1-3> <class> <amount>",
        );
        let report = Report::new(error);
        let output = format!("{:?}", report);
        assert!(output.contains("invalid_command_syntax"));
        assert!(output.contains("<slot 1-3>"));
    }

    #[test]
    fn test_transient_classification() {
        let timeout = DiscordError::Timeout {
            operation: "fetch user",
            timeout: Duration::from_secs(10),
        };
        assert!(timeout.is_transient());
        assert!(!timeout.is_not_found());

        let missing = DiscordError::ChannelNotFound {
            channel_id: 1,
            cause: None,
        };
        assert!(missing.is_not_found());
    }
}
