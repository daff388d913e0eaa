//! HTML rendering for the browser routes

use crate::chat::selection::Selection;
use crate::core::models::{ChatSummary, Group, Message, Profile, Theme};

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn layout(title: &str, theme: Theme, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en" data-theme="{theme}" class="{class}">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · Cynefin</title>
</head>
<body>
{body}
</body>
</html>"#,
        theme = theme.as_str(),
        class = if theme.is_dark() { "dark" } else { "" },
        title = escape(title),
        body = body,
    )
}

fn header(back_href: Option<&str>, title: &str) -> String {
    let back = back_href
        .map(|href| format!(r#"<a class="back" href="{}">Back</a> "#, escape(href)))
        .unwrap_or_default();
    format!("<header>{}<h1>{}</h1></header>", back, escape(title))
}

const SIGN_OUT_FORM: &str = r#"<form method="post" action="/session/logout"><button type="submit">Sign Out</button></form>"#;

pub fn auth_form(error: Option<&str>) -> String {
    let notice = error
        .map(|e| format!(r#"<p class="error" role="alert">{}</p>"#, escape(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<main class="auth">
<h1>Cynefin</h1>
{notice}
<section>
<h2>Sign In</h2>
<form method="post" action="/session/login">
<label>Email <input type="email" name="email" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Sign In</button>
</form>
</section>
<section>
<h2>Sign Up</h2>
<form method="post" action="/session/signup">
<label>Full name <input type="text" name="full_name" required></label>
<label>Email <input type="email" name="email" required></label>
<label>Password <input type="password" name="password" minlength="6" required></label>
<button type="submit">Create account</button>
</form>
</section>
</main>"#
    );
    layout("Sign in", Theme::default(), &body)
}

fn directory_list(users: &[Profile]) -> String {
    if users.is_empty() {
        return r#"<p class="empty">No other users yet.</p>"#.to_string();
    }
    let items: String = users
        .iter()
        .map(|u| {
            format!(
                r#"<li><a href="/chats?user={}">{}</a> <span class="email">{}</span></li>"#,
                urlencoding::encode(&u.id),
                escape(&u.full_name),
                escape(&u.email)
            )
        })
        .collect();
    format!(r#"<ul class="directory">{}</ul>"#, items)
}

fn chat_href(chat: &ChatSummary) -> String {
    if chat.is_group {
        format!("/chats?group={}", urlencoding::encode(&chat.participant_id))
    } else {
        format!("/chats?user={}", urlencoding::encode(&chat.participant_id))
    }
}

fn chat_list(chats: &[ChatSummary], empty: &str) -> String {
    if chats.is_empty() {
        return format!(r#"<p class="empty">{}</p>"#, escape(empty));
    }
    let items: String = chats
        .iter()
        .map(|c| {
            let preview = c.last_message.as_deref().unwrap_or("No messages yet");
            let time = c
                .last_message_time
                .map(|t| format!(r#" <time datetime="{}">{}</time>"#, t.to_rfc3339(), t.format("%H:%M")))
                .unwrap_or_default();
            format!(
                r#"<li><a href="{}">{}</a> <span class="preview">{}</span>{}</li>"#,
                escape(&chat_href(c)),
                escape(&c.participant_name),
                escape(preview),
                time
            )
        })
        .collect();
    format!(r#"<ul class="chats">{}</ul>"#, items)
}

pub fn dashboard(me: &Profile, theme: Theme, recent: &[ChatSummary], users: &[Profile]) -> String {
    let body = format!(
        r#"{header}
<p>Signed in as {name}</p>
{sign_out}
<nav><a href="/discover">Discover</a> <a href="/chats">Chats</a> <a href="/settings">Settings</a></nav>
<main>
<section><h2>Recent Chats</h2>{recent}</section>
<section><h2>Users</h2>{users}</section>
</main>"#,
        header = header(None, "Cynefin"),
        name = escape(&me.full_name),
        sign_out = SIGN_OUT_FORM,
        recent = chat_list(recent, "No recent chats"),
        users = directory_list(users),
    );
    layout("Home", theme, &body)
}

pub fn discover(theme: Theme) -> String {
    let body = format!(
        r#"{}
<main>
<h2>Discover New Connections</h2>
<p>Find and connect with people around the world.</p>
<ul><li>Find People</li><li>Smart Matching</li></ul>
</main>"#,
        header(Some("/"), "Discover")
    );
    layout("Discover", theme, &body)
}

/// Chats page without an open conversation
pub fn chats_index(
    theme: Theme,
    chats: &[ChatSummary],
    groups: &[Group],
    users: &[Profile],
    search: Option<&str>,
) -> String {
    let group_items: String = groups
        .iter()
        .map(|g| {
            format!(
                r#"<li><a href="/chats?group={}">{}</a></li>"#,
                urlencoding::encode(&g.id),
                escape(&g.name)
            )
        })
        .collect();
    let body = format!(
        r#"{header}
<main>
<form method="get" action="/chats"><input type="search" name="search" value="{search}" placeholder="Search chats"><button type="submit">Search</button></form>
<section><h2>All Chats</h2>{chats}</section>
<section><h2>Groups</h2><ul class="groups">{groups}</ul></section>
<section><h2>Users</h2>{users}</section>
</main>"#,
        header = header(Some(Selection::None.back_href()), "Chats"),
        search = escape(search.unwrap_or_default()),
        chats = chat_list(chats, "No chats found"),
        groups = group_items,
        users = directory_list(users),
    );
    layout("Chats", theme, &body)
}

/// Script that streams live inserts into the open conversation.
///
/// `snapshot` and `resynced` carry the server's merged, ordered list and
/// replace the rendered one. A single `message` goes before the first
/// rendered item with a later timestamp.
const LIVE_FEED_SCRIPT: &str = r#"<script>
(() => {
  const list = document.getElementById('messages');
  const conv = list.dataset.conversation;
  const at = (el) => Date.parse(el.querySelector('time').getAttribute('datetime'));
  const render = (m) => {
    const li = document.createElement('li');
    li.dataset.id = m.id;
    li.className = m.sender_id === list.dataset.me ? 'mine' : 'theirs';
    const time = document.createElement('time');
    time.setAttribute('datetime', m.created_at);
    time.textContent = new Date(m.created_at).toTimeString().slice(0, 5);
    li.append(m.content, ' ', time);
    return li;
  };
  const scheme = location.protocol === 'https:' ? 'wss' : 'ws';
  const ws = new WebSocket(`${scheme}://${location.host}/api/conversations/${conv}/subscribe`);
  ws.onmessage = (ev) => {
    const event = JSON.parse(ev.data);
    if (event.type !== 'message') {
      list.replaceChildren(...event.messages.map(render));
      return;
    }
    const m = event.message;
    if ([...list.children].some((li) => li.dataset.id === m.id)) return;
    const when = Date.parse(m.created_at);
    const later = [...list.children].find((li) => at(li) > when);
    list.insertBefore(render(m), later || null);
  };
})();
</script>"#;

/// Chats page with a conversation open
pub fn chat_window(
    theme: Theme,
    me: &Profile,
    selection: &Selection,
    conversation_id: &str,
    messages: &[Message],
) -> String {
    let (field, target_id) = match selection {
        Selection::Individual { id, .. } => ("user", id.as_str()),
        Selection::Group { id, .. } => ("group", id.as_str()),
        Selection::None => ("", ""),
    };
    let title = format!("Chat with {}", selection.name().unwrap_or_default());

    let items: String = messages
        .iter()
        .map(|m| {
            let class = if m.sender_id == me.id { "mine" } else { "theirs" };
            format!(
                r#"<li data-id="{}" class="{}">{} <time datetime="{}">{}</time></li>"#,
                escape(&m.id),
                class,
                escape(&m.content),
                m.created_at.to_rfc3339(),
                m.created_at.format("%H:%M")
            )
        })
        .collect();

    let body = format!(
        r#"{header}
<main>
<ul id="messages" data-conversation="{conv}" data-me="{me}">{items}</ul>
<form method="post" action="/chats/messages">
<input type="hidden" name="conversation_id" value="{conv}">
<input type="hidden" name="{field}" value="{target}">
<input type="text" name="content" placeholder="Type a message" autocomplete="off">
<button type="submit">Send</button>
</form>
</main>
{script}"#,
        header = header(Some(selection.back_href()), &title),
        conv = escape(conversation_id),
        me = escape(&me.id),
        items = items,
        field = field,
        target = escape(target_id),
        script = LIVE_FEED_SCRIPT,
    );
    layout(&title, theme, &body)
}

pub fn settings(me: &Profile, theme: Theme) -> String {
    let options: String = [Theme::Light, Theme::Dark, Theme::System]
        .iter()
        .map(|t| {
            format!(
                r#"<button type="submit" name="theme" value="{v}"{pressed}>{label}</button>"#,
                v = t.as_str(),
                pressed = if *t == theme { r#" aria-pressed="true""# } else { "" },
                label = match t {
                    Theme::Light => "Light",
                    Theme::Dark => "Dark",
                    Theme::System => "System",
                }
            )
        })
        .collect();
    let body = format!(
        r#"{header}
<main>
<section><h2>Account</h2><p>Email: {email}</p></section>
<section><h2>Appearance</h2><p>Dark mode: {dark}</p><form method="post" action="/settings/theme">{options}</form></section>
<section>{sign_out}</section>
</main>"#,
        header = header(Some("/"), "Settings"),
        email = escape(&me.email),
        dark = if theme.is_dark() { "on" } else { "off" },
        options = options,
        sign_out = SIGN_OUT_FORM,
    );
    layout("Settings", theme, &body)
}

pub fn not_found(path: &str) -> String {
    let body = format!(
        r#"<main class="not-found">
<h1>404</h1>
<p>Oops! Page not found</p>
<p class="path">{}</p>
<a href="/">Return to Home</a>
</main>"#,
        escape(path)
    );
    layout("Not found", Theme::default(), &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markup() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_directory_links_are_percent_encoded() {
        let users = vec![Profile {
            id: "a b/c&d".into(),
            full_name: "Ada".into(),
            email: "ada@example.com".into(),
            avatar_url: None,
        }];
        let html = directory_list(&users);
        assert!(html.contains(r#"href="/chats?user=a%20b%2Fc%26d""#));
    }

    #[test]
    fn test_chat_window_renders_history_in_order_with_timestamps() {
        let me = Profile {
            id: "me".into(),
            full_name: "Me".into(),
            email: "me@example.com".into(),
            avatar_url: None,
        };
        let selection = Selection::Individual {
            id: "you".into(),
            name: "You".into(),
        };
        let message = |id: &str, micros: i64| Message {
            id: id.into(),
            conversation_id: "c1".into(),
            sender_id: "you".into(),
            content: id.into(),
            created_at: chrono::DateTime::from_timestamp_micros(micros).unwrap(),
        };
        let history = vec![message("first", 1_000), message("second", 2_000)];

        let html = chat_window(Theme::System, &me, &selection, "c1", &history);

        let first = html.find(r#"data-id="first""#).unwrap();
        let second = html.find(r#"data-id="second""#).unwrap();
        assert!(first < second);
        assert!(html.contains(&format!(r#"datetime="{}""#, history[0].created_at.to_rfc3339())));
        // Catch-up events replace the list rather than appending to it
        assert!(html.contains("list.replaceChildren(...event.messages.map(render))"));
        assert!(html.contains("list.insertBefore(render(m), later || null)"));
    }

    #[test]
    fn test_layout_marks_dark_theme() {
        let html = layout("x", Theme::Dark, "");
        assert!(html.contains(r#"data-theme="dark""#));
        assert!(html.contains(r#"class="dark""#));
    }

    #[test]
    fn test_not_found_shows_path() {
        let html = not_found("/nope<script>");
        assert!(html.contains("404"));
        assert!(html.contains("/nope&lt;script&gt;"));
    }
}
