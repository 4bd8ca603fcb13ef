//! Publishing ride offers and ride requests on behalf of the caller.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
  Error, Result,
  error::Entity,
  identity::Identity,
  ride::{OfferDraft, RequestDraft, RideOffer, RideRequest},
  store::{RideOfferStore, RideRequestStore, UserStore},
};

pub struct RideService<S> {
  store: Arc<S>,
}

impl<S> Clone for RideService<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S> RideService<S>
where
  S: UserStore + RideOfferStore + RideRequestStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Publish an offer with the caller as driver.
  pub async fn create_offer(&self, caller: &Identity, draft: OfferDraft) -> Result<RideOffer> {
    let input = draft.into_new(caller.subject_id, Utc::now())?;
    self.require_user(caller.subject_id, "invalid driver").await?;

    let offer = self.store.create_offer(input).await.map_err(Error::store)?;
    info!(offer_id = %offer.offer_id, driver_id = %caller.subject_id, "offer published");
    Ok(offer)
  }

  pub async fn get_offer(&self, id: Uuid) -> Result<RideOffer> {
    self
      .store
      .get_offer(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found(Entity::RideOffer, id))
  }

  /// Publish a request with the caller as rider.
  pub async fn create_request(
    &self,
    caller: &Identity,
    draft: RequestDraft,
  ) -> Result<RideRequest> {
    let input = draft.into_new(caller.subject_id, Utc::now())?;
    self.require_user(caller.subject_id, "invalid user").await?;

    let request = self.store.create_request(input).await.map_err(Error::store)?;
    info!(request_id = %request.request_id, rider_id = %caller.subject_id, "request published");
    Ok(request)
  }

  pub async fn get_request(&self, id: Uuid) -> Result<RideRequest> {
    self
      .store
      .get_request(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found(Entity::RideRequest, id))
  }

  async fn require_user(&self, id: Uuid, message: &str) -> Result<()> {
    match self.store.get_user(id).await.map_err(Error::store)? {
      Some(_) => Ok(()),
      None => Err(Error::Validation(message.to_owned())),
    }
  }
}
