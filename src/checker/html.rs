// src/checker/html.rs
// =============================================================================
// This module extracts onion links from HTML, one chunk at a time.
//
// Unlike a DOM parser (scraper builds the whole tree in memory), we drive
// html5ever's tokenizer directly. It turns input into a stream of tokens
// (start tag, end tag, text, ...) and we only look at start tags named "a".
// The page can be arbitrarily large: we never keep more than the current
// chunk plus whatever the tokenizer still has pending.
//
// Bytes are decoded with encoding_rs, which keeps state between chunks, so a
// multi-byte character split across two network reads decodes correctly.
//
// Rust concepts:
// - Traits: TokenSink is html5ever's callback interface, we implement it
// - Ownership: the tokenizer owns the sink, we get it back in finish()
// =============================================================================

use super::onion::LinkFilter;
use encoding_rs::{CoderResult, Decoder, UTF_8};
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

// Receives tokens from the tokenizer and keeps matching href values
struct AnchorSink {
    filter: LinkFilter,
    links: Vec<String>,
}

impl TokenSink for AnchorSink {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        let tag = match token {
            Token::TagToken(tag) if tag.kind == TagKind::StartTag => tag,
            _ => return TokenSinkResult::Continue,
        };

        // html5ever lowercases tag and attribute names for us
        if &*tag.name == "a" {
            for attr in &tag.attrs {
                if &*attr.name.local == "href" && self.filter.matches(&attr.value) {
                    self.links.push(attr.value.to_string());
                }
            }
            return TokenSinkResult::Continue;
        }

        // Without a tree builder nobody else switches the tokenizer into
        // text mode, so markup inside these would come out as tags
        match &*tag.name {
            "script" => TokenSinkResult::RawData(RawKind::ScriptData),
            "style" | "xmp" | "iframe" | "noembed" | "noframes" => {
                TokenSinkResult::RawData(RawKind::Rawtext)
            }
            "title" | "textarea" => TokenSinkResult::RawData(RawKind::Rcdata),
            "plaintext" => TokenSinkResult::Plaintext,
            _ => TokenSinkResult::Continue,
        }
    }
}

/// Incremental anchor-link extractor
///
/// Feed it raw body bytes as they arrive, then call `finish` to get the
/// candidate links in document order (duplicates included).
pub struct LinkExtractor {
    tokenizer: Tokenizer<AnchorSink>,
    input: BufferQueue,
    decoder: Decoder,
    text: String,
}

impl LinkExtractor {
    pub fn new(filter: LinkFilter) -> Self {
        let sink = AnchorSink {
            filter,
            links: Vec::new(),
        };
        Self {
            tokenizer: Tokenizer::new(sink, TokenizerOpts::default()),
            input: BufferQueue::new(),
            // Strips a UTF-8 BOM, replaces malformed sequences with U+FFFD
            decoder: UTF_8.new_decoder(),
            text: String::new(),
        }
    }

    /// Tokenizes the next chunk of the document
    pub fn feed(&mut self, chunk: &[u8]) {
        self.decode(chunk, false);
        self.pump();
    }

    /// Flushes pending input and returns every link found
    pub fn finish(mut self) -> Vec<String> {
        self.decode(&[], true);
        self.pump();
        self.tokenizer.end();
        self.tokenizer.sink.links
    }

    #[cfg(test)]
    fn found(&self) -> usize {
        self.tokenizer.sink.links.len()
    }

    fn decode(&mut self, mut chunk: &[u8], last: bool) {
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(chunk.len())
                .unwrap_or(chunk.len() * 3 + 4);
            self.text.reserve(needed);

            let (result, read, _had_errors) =
                self.decoder.decode_to_string(chunk, &mut self.text, last);
            chunk = &chunk[read..];

            match result {
                CoderResult::InputEmpty => break,
                // Not enough room in `text`, reserve more and go again
                CoderResult::OutputFull => continue,
            }
        }
    }

    fn pump(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        self.input.push_back(StrTendril::from(text));
        // Our sink never asks the tokenizer to pause, so this always
        // runs until the queue is drained
        let _ = self.tokenizer.feed(&mut self.input);
    }
}

#[cfg(test)]
fn extract_onion_links(html: &str, filter: &LinkFilter) -> Vec<String> {
    let mut extractor = LinkExtractor::new(filter.clone());
    extractor.feed(html.as_bytes());
    extractor.finish()
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why not scraper?
//    - scraper parses the whole document into a tree before we can query it
//    - That means the whole body has to be in memory first
//    - The tokenizer emits tokens as soon as it has seen enough input
//
// 2. What is a StrTendril?
//    - html5ever's string type, a cheaply-sliceable shared buffer
//    - BufferQueue is a queue of them, the tokenizer pops from the front
//
// 3. Why is `href` checked against the filter here and not later?
//    - A candidate is valid or not once, when it is extracted
//    - Invalid ones never reach the prober
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn onion() -> LinkFilter {
        LinkFilter::onion()
    }

    #[test]
    fn test_extract_onion_links() {
        let html = r#"
            <html><body>
              <a href="http://torlinkbgs6aabns.onion/">Links</a>
              <a href="https://www.google.com">Google</a>
              <a href="https://www.propub3r6espa33w.onion">ProPublica</a>
            </body></html>
        "#;
        let links = extract_onion_links(html, &onion());
        assert_eq!(
            links,
            vec![
                "http://torlinkbgs6aabns.onion/",
                "https://www.propub3r6espa33w.onion"
            ]
        );
    }

    #[test]
    fn test_no_anchors() {
        let html = "<html><body><p>nothing to see</p><img src=\"http://abc.onion/x.png\"></body></html>";
        assert!(extract_onion_links(html, &onion()).is_empty());
    }

    #[test]
    fn test_uppercase_tags_and_attributes() {
        let html = r#"<A HREF="http://abcdef.onion/page">x</A>"#;
        assert_eq!(
            extract_onion_links(html, &onion()),
            vec!["http://abcdef.onion/page"]
        );
    }

    #[test]
    fn test_keeps_duplicates_in_order() {
        let html = r#"<a href="http://b.onion/">1</a><a href="http://a.onion/">2</a><a href="http://b.onion/">3</a>"#;
        assert_eq!(
            extract_onion_links(html, &onion()),
            vec!["http://b.onion/", "http://a.onion/", "http://b.onion/"]
        );
    }

    #[test]
    fn test_entities_in_href_are_decoded() {
        let html = r#"<a href="http://abcdef.onion/?a=1&amp;b=2">x</a>"#;
        assert_eq!(
            extract_onion_links(html, &onion()),
            vec!["http://abcdef.onion/?a=1&b=2"]
        );
    }

    #[test]
    fn test_tag_split_across_chunks() {
        let html = r#"<p>intro</p><a href="http://splitlink.onion/deep/path">x</a>"#;
        let mut extractor = LinkExtractor::new(onion());
        for chunk in html.as_bytes().chunks(3) {
            extractor.feed(chunk);
        }
        assert_eq!(extractor.finish(), vec!["http://splitlink.onion/deep/path"]);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        // "é" is two bytes in UTF-8, split it between feeds
        let html = "<p>caf\u{e9}</p><a href=\"http://abc.onion/\">x</a>";
        let bytes = html.as_bytes();
        let split = html.find('\u{e9}').unwrap() + 1;

        let mut extractor = LinkExtractor::new(onion());
        extractor.feed(&bytes[..split]);
        extractor.feed(&bytes[split..]);
        assert_eq!(extractor.found(), 1);
        assert_eq!(extractor.finish(), vec!["http://abc.onion/"]);
    }

    #[test]
    fn test_markup_inside_text_elements_is_not_a_link() {
        let html = concat!(
            "<script>var s='<a href=\"http://scriptonly.onion/\">'</script>",
            "<textarea><a href=\"http://textareaonly.onion/\"></textarea>",
            "<style>/* <a href=\"http://styleonly.onion/\"> */</style>",
            "<title><a href=\"http://titleonly.onion/\"></title>",
            "<a href=\"http://real.onion/\">real</a>",
        );
        assert_eq!(extract_onion_links(html, &onion()), vec!["http://real.onion/"]);
    }

    #[test]
    fn test_anchor_after_script_split_across_chunks() {
        let html = "<script>if (a < b) { x = '<a href=\"http://fake.onion/\">'; }</script><a href=\"http://real.onion/\">x</a>";
        let mut extractor = LinkExtractor::new(onion());
        for chunk in html.as_bytes().chunks(5) {
            extractor.feed(chunk);
        }
        assert_eq!(extractor.finish(), vec!["http://real.onion/"]);
    }

    #[test]
    fn test_extra_suffix() {
        let html = r#"<a href="https://www.rust-lang.org">Rust</a><a href="http://rustlang.org/">x</a>"#;
        let filter = LinkFilter::with_suffixes(["org"]).unwrap();
        assert_eq!(extract_onion_links(html, &filter), vec!["http://rustlang.org/"]);
    }
}
