use scraper::{Html, Selector};

use crate::types::{AlignReply, ClientError, FailureKind, PipelineOutcome};

/// Classify a raw reply body from the service.
///
/// A bare `0`/`1`/`2` body is a load report; anything else must be a
/// pipeline result document carrying a `downloadLink` element.
pub fn parse_reply(body: &str) -> Result<AlignReply, ClientError> {
    let trimmed = body.trim();
    if let Ok(load) = trimmed.parse::<u8>() {
        if load <= 2 {
            return Ok(AlignReply::Load(load));
        }
    }

    if !body.contains("downloadLink") {
        return Err(ClientError::new(
            FailureKind::MalformedReply,
            "reply is neither a load report nor a pipeline result",
        ));
    }

    // The reply markup is small and flat; the HTML parser lowercases
    // element names, so selectors are spelled lowercase here.
    let document = Html::parse_document(body);
    let success = element_text(&document, "success")
        .map(|text| text == "true")
        .unwrap_or(false);
    let download_link = element_text(&document, "downloadlink").filter(|s| !s.is_empty());
    let output = element_text(&document, "output").filter(|s| !s.is_empty());
    let warnings = element_text(&document, "warnings").filter(|s| !s.is_empty());

    Ok(AlignReply::Pipeline(PipelineOutcome {
        success,
        download_link,
        output,
        warnings,
    }))
}

fn element_text(document: &Html, tag: &str) -> Option<String> {
    let selector = Selector::parse(tag).ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS_REPLY: &str = "<WebServiceResponseLink>\
        <success>true</success>\
        <downloadLink>https://service.example/results/clip.TextGrid</downloadLink>\
        <output>G2P output ok</output>\
        <warnings></warnings>\
        </WebServiceResponseLink>";

    const FAILURE_REPLY: &str = "<WebServiceResponseLink>\
        <success>false</success>\
        <downloadLink></downloadLink>\
        <output></output>\
        <warnings>audio and transcript length mismatch</warnings>\
        </WebServiceResponseLink>";

    #[test]
    fn successful_reply_exposes_link_and_output() {
        let reply = parse_reply(SUCCESS_REPLY).unwrap();
        let AlignReply::Pipeline(outcome) = reply else {
            panic!("expected a pipeline reply");
        };
        assert!(outcome.success);
        assert_eq!(
            outcome.download_link.as_deref(),
            Some("https://service.example/results/clip.TextGrid")
        );
        assert_eq!(outcome.output.as_deref(), Some("G2P output ok"));
        assert_eq!(outcome.warnings, None);
    }

    #[test]
    fn failed_reply_keeps_warnings_and_drops_empty_link() {
        let AlignReply::Pipeline(outcome) = parse_reply(FAILURE_REPLY).unwrap() else {
            panic!("expected a pipeline reply");
        };
        assert!(!outcome.success);
        assert_eq!(outcome.download_link, None);
        assert_eq!(
            outcome.warnings.as_deref(),
            Some("audio and transcript length mismatch")
        );
    }

    #[test]
    fn bare_digit_is_a_load_report() {
        assert_eq!(parse_reply("0").unwrap(), AlignReply::Load(0));
        assert_eq!(parse_reply(" 2\n").unwrap(), AlignReply::Load(2));
    }

    #[test]
    fn unrecognized_body_is_malformed() {
        let err = parse_reply("<html>504 gateway timeout</html>").unwrap_err();
        assert_eq!(err.kind, FailureKind::MalformedReply);
        // A digit above the load range is not a load report either.
        assert!(parse_reply("7").is_err());
    }
}
