use self::encoder::Encoder;
use super::{BuildStrategy, rest::RestRequest};
use crate::error::SocketError;
use derive_more::Constructor;
use hmac::Mac;

/// Signature [`Encoder`]s (eg/ base64) applied to a finalised [`Mac`].
pub mod encoder;

/// API specific signing logic used by a [`RequestSigner`].
pub trait Signer {
    /// Configuration required to sign the [`RestRequest`]s for this API.
    type Config<'a>
    where
        Self: 'a;

    /// Generates a signing [`Self::Config`] for the provided [`RestRequest`] and builder.
    fn config<'a, Request>(
        &'a self,
        request: Request,
        builder: &reqwest::RequestBuilder,
    ) -> Result<Self::Config<'a>, SocketError>
    where
        Request: RestRequest;

    /// Add the bytes to sign to the provided [`Mac`], in the order the API requires.
    fn add_bytes_to_sign<M>(mac: &mut M, config: &Self::Config<'_>)
    where
        M: Mac;

    /// Build the signed [`reqwest::Request`], adding the encoded signature and any other
    /// mandatory headers.
    fn build_signed_request(
        config: Self::Config<'_>,
        builder: reqwest::RequestBuilder,
        signature: String,
    ) -> Result<reqwest::Request, SocketError>;
}

/// Generic [`BuildStrategy`] that signs [`RestRequest`]s using an API specific [`Signer`], a
/// hashable [`Mac`], and a signature [`Encoder`].
#[derive(Debug, Copy, Clone, Constructor)]
pub struct RequestSigner<Sig, Hmac, SigEncoder> {
    signer: Sig,
    mac: Hmac,
    encoder: SigEncoder,
}

impl<Sig, Hmac, SigEncoder> BuildStrategy for RequestSigner<Sig, Hmac, SigEncoder>
where
    Sig: Signer,
    Hmac: Mac + Clone,
    SigEncoder: Encoder,
{
    fn build<Request>(
        &self,
        request: Request,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Request, SocketError>
    where
        Request: RestRequest,
    {
        let config = self.signer.config(request, &builder)?;

        // Each request is signed with a fresh copy of the keyed Mac
        let mut mac = self.mac.clone();
        Sig::add_bytes_to_sign(&mut mac, &config);
        let signature = self.encoder.encode(mac.finalize().into_bytes());

        Sig::build_signed_request(config, builder, signature)
    }
}
