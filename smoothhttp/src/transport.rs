//! `reqwest`-backed producers.
//!
//! A [`RequestProducer`] rebuilds and sends its request on every activation,
//! so retries always start a fresh round trip. Non-2xx responses fail with
//! [`HttpStatusError`], leaving the body for the classifier.

use crate::config::TimeoutConfig;
use crate::decode::{decode_body, ToleranceDecoder, TolerantModel};
use crate::errors::HttpStatusError;
use crate::pipeline::Producer;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder};
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

/// Builds a client with the given connect and request timeouts.
///
/// Use [`TimeoutConfig::io_transfer`] for uploads and downloads.
pub fn build_client(timeouts: &TimeoutConfig) -> Result<Client, reqwest::Error> {
    ClientBuilder::new()
        .connect_timeout(timeouts.connect())
        .timeout(timeouts.request())
        .user_agent(concat!("smoothhttp/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Sends a freshly built request per activation and yields the raw body.
pub struct RequestProducer<F> {
    build: F,
}

impl<F> RequestProducer<F>
where
    F: Fn() -> RequestBuilder + Send + Sync,
{
    /// Creates a producer from a request factory.
    pub fn new(build: F) -> Self {
        Self { build }
    }

    /// Decodes the body into `M` with `decoder`.
    pub fn decoding<M>(self, decoder: ToleranceDecoder) -> DecodingProducer<M, F> {
        DecodingProducer {
            request: self,
            decoder,
            model: PhantomData,
        }
    }

    async fn send(&self, attempt: u32) -> anyhow::Result<Vec<u8>> {
        let response = (self.build)().send().await?;
        let status = response.status();
        debug!(attempt, status = status.as_u16(), url = %response.url(), "Response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpStatusError::new(status.as_u16(), body).into());
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl<F> Producer<Vec<u8>> for RequestProducer<F>
where
    F: Fn() -> RequestBuilder + Send + Sync,
{
    async fn activate(&self, attempt: u32) -> anyhow::Result<Vec<u8>> {
        self.send(attempt).await
    }
}

impl<F> fmt::Debug for RequestProducer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestProducer").finish_non_exhaustive()
    }
}

/// A [`RequestProducer`] whose body is decoded into a model.
pub struct DecodingProducer<M, F> {
    request: RequestProducer<F>,
    decoder: ToleranceDecoder,
    model: PhantomData<fn() -> M>,
}

#[async_trait]
impl<M, F> Producer<M> for DecodingProducer<M, F>
where
    M: TolerantModel + Send,
    F: Fn() -> RequestBuilder + Send + Sync,
{
    async fn activate(&self, attempt: u32) -> anyhow::Result<M> {
        let body = self.request.send(attempt).await?;
        Ok(decode_body(&body, &self.decoder)?)
    }
}

impl<M, F> fmt::Debug for DecodingProducer<M, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodingProducer")
            .field("decoder", &self.decoder)
            .finish_non_exhaustive()
    }
}
