//! 页面渲染：由字段表和当前值生成 HTML
//!
//! Pure functions, no state. Every page shares the same head, title bar and
//! Restart/Configure footer.

use std::borrow::Cow;
use std::fmt::Write;

use crate::schema::FieldSchema;

const STYLE: &str = r#"    <style>
      body{background:#8cc700; font-family:Arial,Helvetica,sans-serif;}
      div.head{background:#00a3c7; margin:10px; padding:10px; border:solid black 1px;}
      div.sub{background:#0fad00; margin:10px; padding:10px; border:solid black 1px;}
      input{background:#8cc700; padding:3px; border:solid black 1px;}
      .but{background:#00a3c7; padding:5px; text-decoration:none; color:black; font-size:small; border:solid black 1px; border-radius:8px;}
      th{text-align:left;}
      small{font-style:italic;}
      b.reset{cursor:pointer;}
    </style>
"#;

const FOOTER: &str = r#"
    <div class='sub' style='text-align:right'>
      <a class='but' href='/restart' title='Restart without save'>Restart</a>
      <a class='but' href='/' title='Reload configuration without save'>Configure</a>
    </div>

  </body>
</html>
"#;

/// Escapes text for use in element content and quoted attributes.
pub fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(&['&', '<', '>', '"', '\''][..]) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Escapes text for a double-quoted JavaScript string literal.
fn escape_js(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            // Keeps "</script>"-like sequences and friends inert.
            '<' => out.push_str("\\x3C"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Wraps `body` in the shared page chrome.
pub fn page(app_name: &str, task: &str, body: &str) -> String {
    let app = escape_html(app_name);
    let mut html = String::with_capacity(STYLE.len() + FOOTER.len() + body.len() + 256);
    html.push_str("<!DOCTYPE html>\r\n<html>\r\n  <head>\r\n");
    let _ = write!(html, "    <title>{app}</title>\r\n");
    html.push_str("    <meta charset='utf-8'>\r\n");
    html.push_str("    <meta name='viewport' content='width=device-width, initial-scale=1.0'>\r\n");
    html.push_str(STYLE);
    html.push_str("  </head>\r\n  <body>\r\n\r\n");
    let _ = write!(
        html,
        "    <div class='head'><b>{app}</b><br/><small>{}</small></div>\r\n",
        escape_html(task)
    );
    html.push_str(body);
    html.push_str(FOOTER);
    html
}

/// The edit form. `values` is indexed like `schema`; missing entries render empty.
pub fn config_form(
    app_name: &str,
    schema: &FieldSchema,
    values: &[&str],
    is_sensitive: impl Fn(&str) -> bool,
) -> String {
    let mut body = String::from(
        "\r\n    <div class='sub'>\r\n      <form method='post' action='/save'><table>\r\n",
    );

    for (index, field) in schema.iter().enumerate() {
        let name = escape_html(&field.name);
        let help = escape_html(&field.help);
        if field.is_header() {
            let _ = write!(
                body,
                "\r\n        <tr class='header'> <th colspan='4'>{name}&nbsp;</th> </tr>\r\n\
                 \x20       <tr class='caption'> <td colspan='4'><small>{help}</small></td> </tr>\r\n"
            );
        } else {
            let value = values.get(index).copied().unwrap_or("");
            let kind = if is_sensitive(&field.name) {
                "password"
            } else {
                "text"
            };
            let js_name = escape_html(&escape_js(&field.name)).into_owned();
            let js_current = escape_html(&escape_js(value)).into_owned();
            let js_default = escape_html(&escape_js(&field.default)).into_owned();
            let _ = write!(
                body,
                "        <tr class='field'>\r\n\
                 \x20         <td><label for='{name}'>{name}</label>&nbsp;</td>\r\n\
                 \x20         <td style='width:90%;'><input type='{kind}' name='{name}' id='{name}' maxlength='{max}' value='{value}' style='width:100%'></td>\r\n\
                 \x20         <td><b class='reset' onclick='document.getElementById(\"{js_name}\").value=\"{js_current}\"' title='Reset to current'>&nbsp;&nbsp;&#x21B6;</b></td>\r\n\
                 \x20         <td><b class='reset' onclick='document.getElementById(\"{js_name}\").value=\"{js_default}\"' title='Reset to default'>&#x2913;</b></td>\r\n\
                 \x20       </tr>\r\n\
                 \x20       <tr> <td></td> <td><small>{help}</small></td> </tr>\r\n",
                max = field.max_len,
                value = escape_html(value),
            );
        }
        if field.help.ends_with(' ') {
            body.push_str("        <tr> <td>&nbsp;</td> </tr>\r\n");
        }
    }

    body.push_str(
        "        <tr> <td><input class='but' type='submit' value='Save' title='Save and restart'></td> </tr>\r\n\
         \x20     </table></form>\r\n    </div>\r\n",
    );
    page(app_name, "Edit configuration", &body)
}

/// Confirmation after `/save`.
pub fn saved_page(app_name: &str, saved: &[String], failed: &[String]) -> String {
    let mut msg = if saved.is_empty() {
        "Nothing to save.".to_string()
    } else {
        format!("Saving {}.", italic_list(saved))
    };
    if !failed.is_empty() {
        let _ = write!(msg, "<br/>Could not save {}.", italic_list(failed));
    }
    let body = format!("    <div class='sub'>{msg}<br/><br/>Will restart shortly.</div>\r\n");
    page(app_name, "Saving configuration", &body)
}

pub fn restart_page(app_name: &str) -> String {
    page(
        app_name,
        "Restarting",
        "    <div class='sub'>Will restart shortly.</div>\r\n",
    )
}

pub fn not_found_page(app_name: &str, path: &str) -> String {
    let body = format!(
        "    <div class='sub'>Page <i>{}</i> not found.</div>\r\n",
        escape_html(path)
    );
    page(app_name, "Error", &body)
}

pub fn error_page(app_name: &str, message: &str) -> String {
    let body = format!("    <div class='sub'>{}</div>\r\n", escape_html(message));
    page(app_name, "Error", &body)
}

fn italic_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("<i>{}</i>", escape_html(n)))
        .collect::<Vec<_>>()
        .join(", ")
}
