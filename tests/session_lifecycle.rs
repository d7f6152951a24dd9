//! End-to-end lifecycle tests through the service facade.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;

use chargenet_core::application::CoreServices;
use chargenet_core::domain::{
    ChargerChain, ConnectorChain, NewCharger, NewCompany, NewConnector, NewDriver, NewDriverGroup,
    NewSite, NewTariff, ProcessorOutcome, SessionInitiator, SessionPaymentStatus, SessionStatus,
    TariffWindow,
};
use chargenet_core::CoreError;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
}

struct Network {
    services: CoreServices,
    company_id: i64,
    chain: ConnectorChain,
    driver_id: i64,
}

/// One company with a site, a 24x7 charger with one connector, a default
/// day/night tariff and an enabled driver.
async fn network() -> Network {
    let services = CoreServices::in_memory();
    let company = services
        .hierarchy
        .create_company(NewCompany::named("Volt Co"))
        .await
        .unwrap();
    let site = services
        .hierarchy
        .create_site(NewSite::named(company.id, "Depot"))
        .await
        .unwrap();
    services
        .hierarchy
        .create_charger(NewCharger::named(
            ChargerChain::new(company.id, site.id, 1),
            "CP-1",
        ))
        .await
        .unwrap();
    let chain = ConnectorChain::new(company.id, site.id, 1, 1);
    services
        .hierarchy
        .create_connector(NewConnector::at(chain))
        .await
        .unwrap();

    let mut tariff = NewTariff::flat(company.id, "Standard", dec("0.40"));
    tariff.rate_nighttime = Some(dec("0.25"));
    tariff.daytime = Some(TariffWindow::new(t(6, 0), t(22, 0)));
    tariff.nighttime = Some(TariffWindow::new(t(22, 0), t(6, 0)));
    tariff.fixed_start_fee = Some(dec("1.00"));
    tariff.idle_fee = Some(dec("5.00"));
    tariff.idle_apply_after_min = Some(240);
    tariff.is_default = true;
    services.ratebook.create_tariff(tariff).await.unwrap();

    let driver = services
        .identity
        .create_driver(NewDriver {
            company_id: company.id,
            full_name: "Ada Lovelace".into(),
            email: Some("ada@example.com".into()),
            phone: None,
            group_id: None,
            enabled: true,
        })
        .await
        .unwrap();

    Network {
        services,
        company_id: company.id,
        chain,
        driver_id: driver.id,
    }
}

#[tokio::test]
async fn full_lifecycle_from_admission_to_reconciliation() {
    let net = network().await;
    let svc = &net.services;

    let session = svc
        .ledger
        .admit_session(net.chain, SessionInitiator::Driver(net.driver_id), at(20, 55))
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Requested);

    svc.ledger.start_session(session.id, at(21, 0)).await.unwrap();

    // 21:00-23:30, 10 kWh: 60 day + 90 night minutes plus the start fee
    let (billed, transaction, breakdown) = svc
        .end_and_bill(session.id, at(23, 30), dec("10"), Some("Remote".into()))
        .await
        .unwrap();
    assert_eq!(billed.status, SessionStatus::Billed);
    assert_eq!(billed.cost, Some(dec("4.10")));
    assert_eq!(billed.payment_status, Some(SessionPaymentStatus::Pending));
    assert_eq!(billed.payment_id, Some(transaction.id));
    assert_eq!(breakdown.day_minutes, 60);
    assert_eq!(breakdown.night_minutes, 90);
    assert_eq!(transaction.amount, dec("4.10"));

    // billing is exactly-once
    assert!(svc.billing.bill_session(session.id).await.is_err());

    svc.reconciler
        .apply_processor_event(&transaction.intent_id, ProcessorOutcome::Succeeded, at(23, 35))
        .await
        .unwrap();
    let reconciled = svc.ledger.get_session(session.id).await.unwrap();
    assert_eq!(reconciled.status, SessionStatus::Reconciled);
    assert_eq!(reconciled.payment_status, Some(SessionPaymentStatus::Paid));

    // duplicate webhook delivery is a no-op
    let again = svc
        .reconciler
        .apply_processor_event(&transaction.intent_id, ProcessorOutcome::Succeeded, at(23, 40))
        .await
        .unwrap();
    assert_eq!(again.id, transaction.id);
}

#[tokio::test]
async fn concurrent_admissions_on_one_connector_admit_exactly_one() {
    let net = network().await;
    let ledger = &net.services.ledger;

    let (a, b) = tokio::join!(
        ledger.admit_session(net.chain, SessionInitiator::Driver(net.driver_id), at(8, 0)),
        ledger.admit_session(net.chain, SessionInitiator::Driver(net.driver_id), at(8, 0)),
    );
    let admitted = [&a, &b]
        .iter()
        .filter(|r| r.as_ref().map(|s| s.status == SessionStatus::Requested).unwrap_or(false))
        .count();
    let busy = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Err(CoreError::ConnectorBusy { .. })))
        .count();
    assert_eq!(admitted, 1);
    assert_eq!(busy, 1);
}

#[tokio::test]
async fn disabled_company_rejects_with_readable_history() {
    let net = network().await;
    let svc = &net.services;

    svc.hierarchy
        .set_company_enabled(net.company_id, false)
        .await
        .unwrap();
    let session = svc
        .ledger
        .admit_session(net.chain, SessionInitiator::Driver(net.driver_id), at(8, 0))
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Rejected);
    assert_eq!(session.reason.as_deref(), Some("company disabled"));

    // history stays queryable through the disabled tenant
    let replay = svc.ledger.get_session(session.id).await.unwrap();
    assert_eq!(replay.status, SessionStatus::Rejected);
}

#[tokio::test]
async fn group_tariff_and_discount_override_the_default() {
    let net = network().await;
    let svc = &net.services;

    let group_tariff = svc
        .ratebook
        .create_tariff(NewTariff::flat(net.company_id, "Fleet", dec("0.20")))
        .await
        .unwrap();
    let discount = svc
        .ratebook
        .create_discount(chargenet_core::domain::NewDiscount {
            company_id: net.company_id,
            name: "Fleet promo".into(),
            kind: chargenet_core::domain::DiscountKind::Percentage,
            value: dec("10"),
            valid_from: None,
            valid_until: None,
        })
        .await
        .unwrap();
    let group = svc
        .identity
        .create_driver_group(NewDriverGroup {
            company_id: net.company_id,
            name: "Fleet".into(),
            tariff_id: group_tariff.id,
            discount_id: Some(discount.id),
        })
        .await
        .unwrap();
    let driver = svc
        .identity
        .create_driver(NewDriver {
            company_id: net.company_id,
            full_name: "Grace Hopper".into(),
            email: None,
            phone: None,
            group_id: Some(group.id),
            enabled: true,
        })
        .await
        .unwrap();

    let session = svc
        .ledger
        .admit_session(net.chain, SessionInitiator::Driver(driver.id), at(8, 0))
        .await
        .unwrap();
    svc.ledger.start_session(session.id, at(8, 0)).await.unwrap();

    // 10 kWh x 0.20 flat, minus 10 percent
    let (billed, _, breakdown) = svc
        .end_and_bill(session.id, at(9, 0), dec("10"), None)
        .await
        .unwrap();
    assert_eq!(billed.tariff_id, Some(group_tariff.id));
    assert_eq!(billed.discount_id, Some(discount.id));
    assert_eq!(breakdown.discount_amount, dec("0.20"));
    assert_eq!(billed.cost, Some(dec("1.80")));
}

#[tokio::test]
async fn failed_payment_keeps_session_billed_until_retry_succeeds() {
    let net = network().await;
    let svc = &net.services;

    let session = svc
        .ledger
        .admit_session(net.chain, SessionInitiator::Driver(net.driver_id), at(8, 0))
        .await
        .unwrap();
    svc.ledger.start_session(session.id, at(8, 0)).await.unwrap();
    let (_, transaction, _) = svc
        .end_and_bill(session.id, at(9, 0), dec("5"), None)
        .await
        .unwrap();

    svc.reconciler
        .apply_processor_event(&transaction.intent_id, ProcessorOutcome::Failed, at(9, 5))
        .await
        .unwrap();
    let after_failure = svc.ledger.get_session(session.id).await.unwrap();
    assert_eq!(after_failure.status, SessionStatus::Billed);
    assert_eq!(
        after_failure.payment_status,
        Some(SessionPaymentStatus::Failed)
    );

    // the retry lands later and reconciles
    svc.reconciler
        .apply_processor_event(&transaction.intent_id, ProcessorOutcome::Succeeded, at(9, 30))
        .await
        .unwrap();
    let reconciled = svc.ledger.get_session(session.id).await.unwrap();
    assert_eq!(reconciled.status, SessionStatus::Reconciled);
}

#[tokio::test]
async fn auto_provisioned_driver_charges_after_enrichment() {
    let net = network().await;
    let svc = &net.services;

    let (user, shell) = svc
        .identity
        .create_user(chargenet_core::domain::NewUser {
            email: "grace@example.com".into(),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            phone: None,
            role: chargenet_core::domain::UserRole::Driver,
            company_id: None,
        })
        .await
        .unwrap();
    let shell = shell.unwrap();

    // shells cannot charge yet
    let rejected = svc
        .ledger
        .admit_session(net.chain, SessionInitiator::Driver(shell.id), at(8, 0))
        .await
        .unwrap();
    assert_eq!(rejected.status, SessionStatus::Rejected);

    // provisioning twice returns the same record
    let again = svc.identity.provision_driver_for_user(user.id).await.unwrap();
    assert_eq!(again.id, shell.id);

    svc.identity
        .enrich_driver(shell.id, net.company_id, None)
        .await
        .unwrap();
    let admitted = svc
        .ledger
        .admit_session(net.chain, SessionInitiator::Driver(shell.id), at(8, 10))
        .await
        .unwrap();
    assert_eq!(admitted.status, SessionStatus::Requested);
}
