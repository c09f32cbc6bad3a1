use fibre_di::{resolve, type_token, Container, DiError};
use std::sync::Arc;

// --- Abstraction and Implementations ---
trait MessageSender: Send + Sync {
  fn send(&self, to: &str, message: &str) -> String;
}

struct EmailSender;
impl MessageSender for EmailSender {
  fn send(&self, to: &str, message: &str) -> String {
    format!("Sending email to {}: '{}'", to, message)
  }
}

struct SmsSender;
impl MessageSender for SmsSender {
  fn send(&self, to: &str, message: &str) -> String {
    format!("Sending SMS to {}: '{}'", to, message)
  }
}

type_token!(dyn MessageSender);

fn main() -> Result<(), DiError> {
  // --- Registration ---
  // Both implementations are bound to the same trait under different names.
  let container = Container::new(|b| {
    b.bind::<dyn MessageSender>()
      .named("email")
      .instance_arc(Arc::new(EmailSender))?;
    b.bind::<dyn MessageSender>()
      .named("sms")
      .instance_arc(Arc::new(SmsSender))
  })?;

  // --- Resolution ---
  let email_notifier = resolve!(&container, trait MessageSender, "email");
  let sms_notifier = resolve!(&container, trait MessageSender, "sms");

  let result1 = email_notifier.send("test@example.com", "Hello from Fibre!");
  let result2 = sms_notifier.send("+123456789", "Hello from Fibre!");

  println!("{}", result1);
  println!("{}", result2);

  assert!(result1.contains("email"));
  assert!(result2.contains("SMS"));

  // The unnamed binding is a different key and was never bound.
  assert!(container.instance_or_none::<dyn MessageSender>(None)?.is_none());
  Ok(())
}
