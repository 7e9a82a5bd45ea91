//! Entry-point attribute macros for the remex runtime.

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Runtime options accepted by both attribute macros.
struct Options {
    worker_threads: Option<usize>,
    inline: bool,
}

impl Options {
    /// Parses `worker_threads = N` and `flavor = "inline"` from the
    /// attribute token stream.
    fn parse(attr: TokenStream) -> Result<Self, String> {
        let mut options = Options {
            worker_threads: None,
            inline: false,
        };

        let attr = attr.to_string();
        if attr.is_empty() {
            return Ok(options);
        }

        for part in attr.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                return Err(format!("expected `key = value`, found `{}`", part.trim()));
            };

            match key.trim() {
                "worker_threads" => match value.trim().parse::<usize>() {
                    Ok(n) if n > 0 => options.worker_threads = Some(n),
                    _ => return Err("worker_threads must be a positive integer".into()),
                },

                "flavor" => match value.trim().trim_matches('"') {
                    "inline" => options.inline = true,
                    "multi_thread" => options.inline = false,
                    other => return Err(format!("unknown flavor `{other}`")),
                },

                other => return Err(format!("unknown option `{other}`")),
            }
        }

        Ok(options)
    }

    /// Renders the builder expression for these options.
    fn builder(&self) -> String {
        let mut out = if self.inline {
            String::from("::remex::RuntimeBuilder::inline()")
        } else {
            String::from("::remex::RuntimeBuilder::new()")
        };

        if let Some(n) = self.worker_threads {
            out.push_str(&format!(".worker_threads({n})"));
        }

        out.push_str(".build()");
        out
    }
}

/// Rewrites an `async fn`: strips the `async` keyword and wraps the body
/// in `builder.block_on(async move { ... })`.
fn wrap(item: TokenStream, options: &Options, expect: &str) -> TokenStream {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let Some(pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(ident) if ident.to_string() == "async"))
    else {
        return error("this function must be declared async");
    };
    tokens.remove(pos);

    let Some(pos) = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
    else {
        return error("expected a function body");
    };

    let body = match &tokens[pos] {
        TokenTree::Group(group) => group.stream(),
        _ => unreachable!(),
    };

    let wrapped = format!(
        "{{
            let runtime = {builder};
            runtime
                .block_on(async move {{ {body} }})
                .expect(\"{expect}\")
        }}",
        builder = options.builder(),
    );

    tokens[pos] = TokenTree::Group(Group::new(
        Delimiter::Brace,
        wrapped.parse().expect("generated body must parse"),
    ));

    tokens.into_iter().collect()
}

fn error(message: &str) -> TokenStream {
    format!("compile_error!(\"{message}\");").parse().unwrap()
}

/// Marks an async function as the runtime entry point.
///
/// The function loses its `async` keyword and its body runs through
/// `Runtime::block_on` on a runtime built from the attribute options.
///
/// ```ignore
/// #[remex::main]
/// async fn main() { ... }
///
/// #[remex::main(worker_threads = 4)]
/// async fn main() { ... }
///
/// #[remex::main(flavor = "inline")]
/// async fn main() { ... }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    match Options::parse(attr) {
        Ok(options) => wrap(item, &options, "runtime error"),
        Err(message) => error(&message),
    }
}

/// Marks an async function as a test running inside a fresh runtime.
///
/// Accepts the same options as [`macro@main`] and adds `#[test]`.
///
/// ```ignore
/// #[remex::test]
/// async fn smoke() { ... }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let options = match Options::parse(attr) {
        Ok(options) => options,
        Err(message) => return error(&message),
    };

    let mut out: Vec<TokenTree> = "#[test]"
        .parse::<TokenStream>()
        .unwrap()
        .into_iter()
        .collect();
    out.extend(wrap(item, &options, "test runtime error"));

    out.into_iter().collect()
}
