use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

use crate::error::ClientError;
use crate::session::context::RoleChooser;
use crate::types::Role;

/// Line-oriented prompts over one buffered reader. Every prompt shares the
/// buffer, so piped answers are consumed in order.
pub struct LinePrompt<R> {
    reader: Mutex<R>,
}

pub type StdinPrompt = LinePrompt<BufReader<Stdin>>;

static STDIN: Lazy<StdinPrompt> = Lazy::new(|| LinePrompt::new(BufReader::new(tokio::io::stdin())));

/// Process-wide prompt on stdin
pub fn stdin() -> &'static StdinPrompt {
    &STDIN
}

impl<R: AsyncBufRead + Unpin + Send> LinePrompt<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
        }
    }

    /// Read one trimmed line after printing `label` to stderr.
    /// `None` on end of input.
    pub async fn read_line(&self, label: &str) -> std::io::Result<Option<String>> {
        eprint!("{}", label);
        std::io::stderr().flush()?;

        let mut line = String::new();
        let read = self.reader.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Use the given password or ask for one
    pub async fn password(&self, provided: Option<String>) -> anyhow::Result<String> {
        if let Some(password) = provided {
            return Ok(password);
        }

        match self.read_line("Password: ").await? {
            Some(password) if !password.is_empty() => Ok(password),
            _ => anyhow::bail!("a password is required"),
        }
    }

    /// Ask until the answer names one of `options`; end of input aborts
    pub async fn choose_role(&self, options: &[Role]) -> Result<Role, ClientError> {
        eprintln!("This account holds several roles. Choose one for this session:");
        for (i, role) in options.iter().enumerate() {
            eprintln!("  {}) {}", i + 1, role.label());
        }

        loop {
            let line = self
                .read_line("Role: ")
                .await
                .map_err(|e| ClientError::invalid_selection(format!("could not read choice: {}", e)))?;

            match line {
                None => return Err(ClientError::invalid_selection("no role chosen")),
                Some(answer) => match parse_choice(&answer, options) {
                    Some(role) => return Ok(role),
                    None => eprintln!("'{}' is not one of the listed roles", answer),
                },
            }
        }
    }
}

pub async fn resolve_password(provided: Option<String>) -> anyhow::Result<String> {
    stdin().password(provided).await
}

/// Accepts a 1-based index into `options` or a role name among them
pub fn parse_choice(input: &str, options: &[Role]) -> Option<Role> {
    if let Ok(index) = input.trim().parse::<usize>() {
        return index.checked_sub(1).and_then(|i| options.get(i)).copied();
    }

    input
        .parse::<Role>()
        .ok()
        .filter(|role| options.contains(role))
}

/// Interactive role picker on stdin/stderr
pub struct StdinRoleChooser;

#[async_trait]
impl RoleChooser for StdinRoleChooser {
    async fn present_choice(&self, options: &[Role]) -> Result<Role, ClientError> {
        stdin().choose_role(options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_choice_accepts_index_or_name() {
        let options = [Role::Manager, Role::Staff];
        assert_eq!(parse_choice("2", &options), Some(Role::Staff));
        assert_eq!(parse_choice("manager", &options), Some(Role::Manager));
        assert_eq!(parse_choice("0", &options), None);
        assert_eq!(parse_choice("3", &options), None);
        assert_eq!(parse_choice("user", &options), None);
    }

    #[tokio::test]
    async fn piped_password_and_role_are_read_in_order() {
        let prompt = LinePrompt::new(BufReader::new(&b"pw\n9\n2\n"[..]));

        assert_eq!(prompt.password(None).await.unwrap(), "pw");
        let role = prompt.choose_role(&[Role::Manager, Role::Staff]).await.unwrap();
        assert_eq!(role, Role::Staff);
        assert_eq!(prompt.read_line("").await.unwrap(), None);
    }

    #[tokio::test]
    async fn end_of_input_aborts_role_choice() {
        let prompt = LinePrompt::new(BufReader::new(&b"pw\n"[..]));

        assert_eq!(prompt.password(Some("given".into())).await.unwrap(), "given");
        let err = prompt.choose_role(&[Role::Manager, Role::Staff]).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidSelection(_)));
    }
}
