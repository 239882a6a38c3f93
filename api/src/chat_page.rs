/// Browser chat UI served at `/chat`.
///
/// History lives in the page only. Replies follow the same rules as the
/// terminal client: `response` is shown as-is, an `error` field becomes
/// `Error: ...`, anything else gets the fallback apology, and a failed
/// request shows `Error: <reason>`.
pub const CHAT_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Pursuit Assistant</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }
  #history { border: 1px solid #ccc; border-radius: 6px; padding: 1rem; min-height: 20rem; overflow-y: auto; }
  .message { margin: 0.5rem 0; white-space: pre-wrap; }
  .user { color: #1a4d8f; }
  .assistant { color: #222; }
  form { display: flex; gap: 0.5rem; margin-top: 1rem; }
  input { flex: 1; padding: 0.5rem; }
</style>
</head>
<body>
<h1>Pursuit Assistant</h1>
<p>Ask about the intake pursuits.</p>
<div id="history"></div>
<form id="chat-form">
  <input id="chat-input" type="text" autocomplete="off" placeholder="Ask a question...">
  <button type="submit">Send</button>
</form>
<script>
  const FALLBACK_REPLY = "Sorry, something went wrong.";
  const history = [];
  const historyEl = document.getElementById("history");
  const form = document.getElementById("chat-form");
  const input = document.getElementById("chat-input");

  function render(message) {
    const el = document.createElement("div");
    el.className = "message " + message.role;
    el.textContent = (message.role === "user" ? "You: " : "Assistant: ") + message.content;
    historyEl.appendChild(el);
    historyEl.scrollTop = historyEl.scrollHeight;
  }

  function push(role, content) {
    const message = { role, content };
    history.push(message);
    render(message);
  }

  function replyFromBody(body) {
    if (body && typeof body.response === "string") {
      return body.response;
    }
    if (body && typeof body.error === "string") {
      return "Error: " + body.error;
    }
    return FALLBACK_REPLY;
  }

  async function ask(query) {
    try {
      const resp = await fetch("/query", {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify({ query }),
      });
      return replyFromBody(await resp.json());
    } catch (err) {
      return "Error: " + err.message;
    }
  }

  form.addEventListener("submit", async (event) => {
    event.preventDefault();
    const query = input.value.trim();
    if (!query) {
      return;
    }
    input.value = "";
    push("user", query);
    push("assistant", await ask(query));
  });
</script>
</body>
</html>
"#;
