use std::sync::Arc;

use crate::{
    domain::{
        build_parcel, Address, BuiltinCountryNames, CountryNames, Order, Parcel, Shipment,
        StoreOrigin, TrackingRecord, CARRIER_CODE, CARRIER_TOKEN,
    },
    infra::{
        cache::{QuoteCache, RequestParams},
        debug_log::DebugSink,
        gateway::{GatewayCredentials, GatewayError, GatewayResponse, HttpGateway, ParcelGateway},
        notify::Notifier,
    },
    util::settings::{CarrierConfig, ConfigSource, PlaintextSecrets, SecretDecryptor},
};

pub const SUCCESS_NOTICE: &str = "Successful registered shipment as Parcify parcel.";
pub const ERROR_NOTICE_PREFIX: &str = "Error creating Parcify parcel: ";

/// Redirect target when the request carried no referer.
const FALLBACK_REDIRECT: &str = "/";

/// What the host should do with the shipment save it is about to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The order does not ship with Parcify.
    NotApplicable,
    /// Registered; persist the shipment.
    Proceed { parcel_id: Option<String> },
    /// Registration failed; do not persist, send the user back to `target`.
    AbortWithRedirect { target: String },
}

impl SaveOutcome {
    pub fn allows_save(&self) -> bool {
        !matches!(self, SaveOutcome::AbortWithRedirect { .. })
    }
}

/// Registers shipments as Parcify parcels before the host saves them.
pub struct ShipmentRegistration {
    config: CarrierConfig,
    origin: StoreOrigin,
    gateway: Arc<dyn ParcelGateway>,
    notifier: Arc<dyn Notifier>,
    secrets: Arc<dyn SecretDecryptor>,
    countries: Arc<dyn CountryNames>,
    registrations: Option<Arc<QuoteCache<GatewayResponse>>>,
}

impl ShipmentRegistration {
    pub fn new(
        config: CarrierConfig,
        origin: StoreOrigin,
        gateway: Arc<dyn ParcelGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            origin,
            gateway,
            notifier,
            secrets: Arc::new(PlaintextSecrets),
            countries: Arc::new(BuiltinCountryNames),
            registrations: None,
        }
    }

    /// Wires the HTTP gateway and remembers registrations in `cache`.
    pub fn connect(
        source: &dyn ConfigSource,
        notifier: Arc<dyn Notifier>,
        sink: Arc<dyn DebugSink>,
        cache: Arc<QuoteCache<GatewayResponse>>,
    ) -> Result<Self, GatewayError> {
        let config = CarrierConfig::from_source(source);
        let origin = StoreOrigin::from_source(source);
        let gateway = Arc::new(HttpGateway::new(&config, sink)?);
        Ok(Self::new(config, origin, gateway, notifier).with_registration_cache(cache))
    }

    /// Reuses a shipment's earlier successful registration when its save is retried.
    pub fn with_registration_cache(mut self, cache: Arc<QuoteCache<GatewayResponse>>) -> Self {
        self.registrations = Some(cache);
        self
    }

    pub fn with_secrets(mut self, secrets: Arc<dyn SecretDecryptor>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn with_countries(mut self, countries: Arc<dyn CountryNames>) -> Self {
        self.countries = countries;
        self
    }

    pub fn config(&self) -> &CarrierConfig {
        &self.config
    }

    pub async fn on_shipment_save_before(
        &self,
        shipment: &mut Shipment,
        order: &Order,
        referer: Option<&str>,
    ) -> SaveOutcome {
        if !order.ships_with(CARRIER_TOKEN) {
            return SaveOutcome::NotApplicable;
        }

        let fallback = Address::default();
        let shipping_address = order.shipping_address.as_ref().unwrap_or(&fallback);
        let parcel = build_parcel(
            order,
            shipping_address,
            &self.config,
            &self.origin,
            self.countries.as_ref(),
        );
        let credentials = GatewayCredentials::from_config(&self.config, self.secrets.as_ref());

        tracing::info!(
            order = %order.increment_id,
            carrier = CARRIER_CODE,
            "Registering shipment as Parcify parcel"
        );
        let response = self.submit(shipment, &parcel, &credentials).await;

        if response.is_success() {
            let parcel_id = response.parcel_id().map(str::to_string);
            if let Some(id) = &parcel_id {
                shipment.add_track(TrackingRecord::parcel(id.clone()));
            }
            self.notifier.success(SUCCESS_NOTICE);
            tracing::info!(order = %order.increment_id, parcel_id = ?parcel_id, "Parcify parcel registered");
            return SaveOutcome::Proceed { parcel_id };
        }

        let message = format!("{ERROR_NOTICE_PREFIX}{}", response.errors().concat());
        self.notifier.error(&message);
        tracing::warn!(order = %order.increment_id, "Aborting shipment save: {message}");

        let target = referer
            .map(str::trim)
            .filter(|referer| !referer.is_empty())
            .unwrap_or(FALLBACK_REDIRECT)
            .to_string();
        SaveOutcome::AbortWithRedirect { target }
    }

    async fn submit(
        &self,
        shipment: &Shipment,
        parcel: &Parcel,
        credentials: &GatewayCredentials,
    ) -> GatewayResponse {
        // Shipments without a host id cannot be told apart; always submit them.
        let cached = match (&self.registrations, &shipment.id) {
            (Some(cache), Some(id)) => Some((cache, registration_params(id, parcel, credentials))),
            _ => None,
        };

        if let Some((cache, params)) = &cached {
            if let Some(response) = cache.cached(params).await {
                tracing::debug!(shipment = ?shipment.id, "Reusing earlier Parcify registration");
                return response;
            }
        }

        let response = self.gateway.submit_parcel(parcel, credentials).await;
        if let Some((cache, params)) = &cached {
            if response.is_success() && response.parcel_id().is_some() {
                cache.store(params, response.clone()).await;
            }
        }
        response
    }
}

fn registration_params(
    shipment_id: &str,
    parcel: &Parcel,
    credentials: &GatewayCredentials,
) -> RequestParams {
    let mut fields = vec![("shipment.id".to_string(), shipment_id.to_string())];
    fields.extend(parcel.fields());
    fields.push(("gateway.url".into(), credentials.url.clone()));
    fields.push(("gateway.user".into(), credentials.username.clone()));
    RequestParams::Fields(fields)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::Parcel;
    use crate::infra::debug_log::TracingDebugSink;
    use crate::infra::gateway::{ParcelCreated, MISSING_PASSWORD, MISSING_URL, REJECTED_MESSAGE};
    use crate::infra::notify::{NotificationKind, SessionMessages};
    use crate::util::settings::MapConfig;

    struct FakeGateway {
        response: GatewayResponse,
        seen: Mutex<Vec<(Parcel, GatewayCredentials)>>,
    }

    impl FakeGateway {
        fn answering(response: GatewayResponse) -> Arc<Self> {
            Arc::new(Self {
                response,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<(Parcel, GatewayCredentials)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ParcelGateway for FakeGateway {
        async fn submit_parcel(
            &self,
            parcel: &Parcel,
            credentials: &GatewayCredentials,
        ) -> GatewayResponse {
            self.seen
                .lock()
                .unwrap()
                .push((parcel.clone(), credentials.clone()));
            self.response.clone()
        }
    }

    struct Rot13;

    impl SecretDecryptor for Rot13 {
        fn decrypt(&self, stored: &str) -> String {
            stored
                .chars()
                .map(|ch| match ch {
                    'a'..='m' | 'A'..='M' => (ch as u8 + 13) as char,
                    'n'..='z' | 'N'..='Z' => (ch as u8 - 13) as char,
                    _ => ch,
                })
                .collect()
        }
    }

    fn config() -> CarrierConfig {
        CarrierConfig {
            parcel_name: "Webshop #".into(),
            user_id: "shop-7".into(),
            password: "frperg".into(),
            gateway_url: "https://api.parcify.test/v1/parcels".into(),
            ..Default::default()
        }
    }

    fn order() -> Order {
        Order {
            increment_id: "100000042".into(),
            shipping_method: "parcify_carrier_free_shipping".into(),
            shipping_address: Some(Address {
                street: vec!["Meir 50".into()],
                postcode: Some("2000".into()),
                city: Some("Antwerpen".into()),
                country_id: Some("BE".into()),
                email: Some("jan@example.be".into()),
                telephone: Some("+32470000000".into()),
                ..Default::default()
            }),
        }
    }

    fn workflow(gateway: Arc<FakeGateway>, session: Arc<SessionMessages>) -> ShipmentRegistration {
        ShipmentRegistration::new(config(), StoreOrigin::default(), gateway, session)
            .with_secrets(Arc::new(Rot13))
    }

    #[tokio::test]
    async fn other_carriers_are_left_alone() {
        let gateway = FakeGateway::answering(GatewayResponse::failure(vec![]));
        let session = Arc::new(SessionMessages::new());
        let mut shipment = Shipment::new("42");
        let order = Order {
            shipping_method: "flatrate_flatrate".into(),
            ..order()
        };

        let outcome = workflow(gateway.clone(), session.clone())
            .on_shipment_save_before(&mut shipment, &order, Some("/admin/order/42"))
            .await;

        assert_eq!(outcome, SaveOutcome::NotApplicable);
        assert!(outcome.allows_save());
        assert!(gateway.seen().is_empty());
        assert!(session.snapshot().is_empty());
    }

    #[tokio::test]
    async fn success_attaches_tracking_and_notifies() {
        let gateway = FakeGateway::answering(GatewayResponse::created(ParcelCreated {
            parcel_id: Some("ABC123".into()),
        }));
        let session = Arc::new(SessionMessages::new());
        let mut shipment = Shipment::new("42");

        let outcome = workflow(gateway.clone(), session.clone())
            .on_shipment_save_before(&mut shipment, &order(), Some("/admin/order/42"))
            .await;

        assert_eq!(
            outcome,
            SaveOutcome::Proceed {
                parcel_id: Some("ABC123".into())
            }
        );
        assert_eq!(shipment.tracks(), [TrackingRecord::parcel("ABC123")]);
        let notices = session.snapshot();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NotificationKind::Success);
        assert_eq!(notices[0].text, SUCCESS_NOTICE);

        let (parcel, credentials) = gateway.seen().remove(0);
        assert_eq!(parcel.package.name, "Webshop #100000042");
        assert_eq!(parcel.delivery.address, "Meir 50, 2000 Antwerpen, Belgium");
        assert_eq!(credentials.username, "shop-7");
        assert_eq!(credentials.password, "secret");
    }

    #[tokio::test]
    async fn success_without_parcel_id_adds_no_track() {
        let gateway = FakeGateway::answering(GatewayResponse::created(ParcelCreated::default()));
        let session = Arc::new(SessionMessages::new());
        let mut shipment = Shipment::new("42");

        let outcome = workflow(gateway, session.clone())
            .on_shipment_save_before(&mut shipment, &order(), None)
            .await;

        assert_eq!(outcome, SaveOutcome::Proceed { parcel_id: None });
        assert!(shipment.tracks().is_empty());
        assert_eq!(session.snapshot()[0].kind, NotificationKind::Success);
    }

    #[tokio::test]
    async fn rejection_aborts_with_redirect_to_referer() {
        let gateway =
            FakeGateway::answering(GatewayResponse::failure(vec![REJECTED_MESSAGE.to_string()]));
        let session = Arc::new(SessionMessages::new());
        let mut shipment = Shipment::new("42");

        let outcome = workflow(gateway, session.clone())
            .on_shipment_save_before(&mut shipment, &order(), Some("/admin/order/42/ship"))
            .await;

        assert_eq!(
            outcome,
            SaveOutcome::AbortWithRedirect {
                target: "/admin/order/42/ship".into()
            }
        );
        assert!(!outcome.allows_save());
        assert!(shipment.tracks().is_empty());
        let notices = session.snapshot();
        assert_eq!(notices[0].kind, NotificationKind::Error);
        assert_eq!(notices[0].text, format!("{ERROR_NOTICE_PREFIX}{REJECTED_MESSAGE}"));
    }

    #[tokio::test]
    async fn error_messages_are_concatenated() {
        let gateway = FakeGateway::answering(GatewayResponse::failure(vec![
            MISSING_URL.to_string(),
            MISSING_PASSWORD.to_string(),
        ]));
        let session = Arc::new(SessionMessages::new());
        let mut shipment = Shipment::new("42");

        let outcome = workflow(gateway, session.clone())
            .on_shipment_save_before(&mut shipment, &order(), Some("  "))
            .await;

        assert_eq!(
            outcome,
            SaveOutcome::AbortWithRedirect {
                target: FALLBACK_REDIRECT.into()
            }
        );
        assert_eq!(
            session.snapshot()[0].text,
            format!("{ERROR_NOTICE_PREFIX}{MISSING_URL}{MISSING_PASSWORD}")
        );
    }

    #[tokio::test]
    async fn configured_gateway_without_url_aborts_before_any_request() {
        let source = MapConfig::new()
            .with_carrier("userid", "shop-7")
            .with_carrier("password", "secret");
        let session = Arc::new(SessionMessages::new());
        let workflow = ShipmentRegistration::connect(
            &source,
            session.clone(),
            Arc::new(TracingDebugSink),
            QuoteCache::shared(CARRIER_CODE),
        )
        .unwrap();
        let mut shipment = Shipment::new("42");

        let outcome = workflow
            .on_shipment_save_before(&mut shipment, &order(), Some("/back"))
            .await;

        assert!(!outcome.allows_save());
        assert_eq!(
            session.snapshot()[0].text,
            format!("{ERROR_NOTICE_PREFIX}{MISSING_URL}")
        );
    }

    struct SequenceGateway {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl ParcelGateway for SequenceGateway {
        async fn submit_parcel(&self, _: &Parcel, _: &GatewayCredentials) -> GatewayResponse {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            GatewayResponse::created(ParcelCreated {
                parcel_id: Some(format!("P{calls}")),
            })
        }
    }

    fn cached_workflow(gateway: Arc<SequenceGateway>) -> ShipmentRegistration {
        ShipmentRegistration::new(
            config(),
            StoreOrigin::default(),
            gateway,
            Arc::new(SessionMessages::new()),
        )
        .with_registration_cache(QuoteCache::shared(CARRIER_CODE))
    }

    fn sequence_gateway() -> Arc<SequenceGateway> {
        Arc::new(SequenceGateway {
            calls: Mutex::new(0),
        })
    }

    #[tokio::test]
    async fn partial_shipments_of_one_order_each_get_their_own_parcel() {
        let gateway = sequence_gateway();
        let workflow = cached_workflow(gateway.clone());
        let mut first = Shipment::new("42").with_id("501");
        let mut second = Shipment::new("42").with_id("502");

        let a = workflow
            .on_shipment_save_before(&mut first, &order(), None)
            .await;
        let b = workflow
            .on_shipment_save_before(&mut second, &order(), None)
            .await;

        assert_eq!(*gateway.calls.lock().unwrap(), 2);
        assert_eq!(a, SaveOutcome::Proceed { parcel_id: Some("P1".into()) });
        assert_eq!(b, SaveOutcome::Proceed { parcel_id: Some("P2".into()) });
        assert_eq!(first.tracks(), [TrackingRecord::parcel("P1")]);
        assert_eq!(second.tracks(), [TrackingRecord::parcel("P2")]);
    }

    #[tokio::test]
    async fn retried_save_of_same_shipment_reuses_registration() {
        let gateway = sequence_gateway();
        let workflow = cached_workflow(gateway.clone());

        for _ in 0..2 {
            let mut shipment = Shipment::new("42").with_id("501");
            let outcome = workflow
                .on_shipment_save_before(&mut shipment, &order(), None)
                .await;
            assert_eq!(outcome, SaveOutcome::Proceed { parcel_id: Some("P1".into()) });
        }
        assert_eq!(*gateway.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn shipments_without_id_always_submit() {
        let gateway = sequence_gateway();
        let workflow = cached_workflow(gateway.clone());

        for _ in 0..2 {
            let mut shipment = Shipment::new("42");
            workflow
                .on_shipment_save_before(&mut shipment, &order(), None)
                .await;
        }
        assert_eq!(*gateway.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn failed_registrations_are_not_remembered() {
        let gateway =
            FakeGateway::answering(GatewayResponse::failure(vec![REJECTED_MESSAGE.to_string()]));
        let workflow = workflow(gateway.clone(), Arc::new(SessionMessages::new()))
            .with_registration_cache(QuoteCache::shared(CARRIER_CODE));

        for _ in 0..2 {
            let mut shipment = Shipment::new("42").with_id("501");
            workflow
                .on_shipment_save_before(&mut shipment, &order(), None)
                .await;
        }
        assert_eq!(gateway.seen().len(), 2);
    }
}
