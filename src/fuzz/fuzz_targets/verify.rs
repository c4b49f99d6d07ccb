#![no_main]
use {
    arbitrary::Arbitrary,
    chrono::{DateTime, Duration, Utc},
    http::{Request, Uri},
    libfuzzer_sys::{fuzz_target, Corpus},
    signed_url::{SignOptions, SigningSecret, SingleUseToken, UrlParts, UrlSigner, Verifier},
    std::str::FromStr,
};

#[derive(Arbitrary, Debug)]
struct VerifyInput {
    url: String,
    token: Option<String>,
    issued_token: Option<String>,
    expires: Option<u32>,
    server_timestamp: i64,
}

fuzz_target!(|data: VerifyInput| -> Corpus {
    let Some(server_timestamp) = DateTime::<Utc>::from_timestamp(data.server_timestamp, 0) else {
        return Corpus::Reject;
    };

    let signer = UrlSigner::new(SigningSecret::from_str("S3CRET").unwrap());
    let verifier = Verifier::new(signer.clone());
    let token = data.token.as_deref().map(SingleUseToken::from);

    // Arbitrary input must never panic.
    let _ = verifier.verify_at(data.url.as_str(), token.clone(), server_timestamp);

    // Parsing is stable, and anything we sign must pass the signature check.
    let parts = UrlParts::parse(&data.url);
    assert_eq!(UrlParts::parse(&parts.to_string()), parts);
    let signed = signer.sign(&data.url);
    assert!(signer.check(signed.as_str()), "signature check failed for {:?}", signed);
    assert_eq!(signer.sign(&signed), signed);

    let mut options = SignOptions::builder();
    if let Some(expires) = data.expires {
        options.expires(Duration::seconds(expires as i64));
    }
    if let Some(issued_token) = data.issued_token.as_deref() {
        options.single_use_token(issued_token);
    }
    let Ok(options) = options.build() else {
        return Corpus::Reject;
    };

    if let Ok(signed) = signer.sign_with_at(&data.url, &options, server_timestamp) {
        // A passing single-use URL means the supplied token is the one it was issued with.
        if verifier.verify_at(signed.as_str(), token.clone(), server_timestamp).is_ok() {
            if let Some(issued_token) = data.issued_token.as_deref().filter(|t| !t.is_empty()) {
                assert_eq!(data.token.as_deref(), Some(issued_token));
            }
        }

        // The same absolute URL received as an HTTP request verifies the same way.
        let string_result = verifier.verify_at(signed.as_str(), token.clone(), server_timestamp);
        let signed_parts = UrlParts::parse(&signed);
        if let Ok(uri) = Uri::from_str(&signed) {
            if uri.scheme_str().is_some() && uri.scheme_str() == signed_parts.scheme() {
                if let Ok(request) = Request::builder().uri(uri).body(()) {
                    let request_result = verifier.verify_at(&request, token, server_timestamp);
                    assert_eq!(
                        request_result.is_ok(),
                        string_result.is_ok(),
                        "{:?} verified differently as a request: {:?} vs {:?}",
                        signed,
                        request_result,
                        string_result
                    );
                }
            }
        }
    }

    Corpus::Keep
});
