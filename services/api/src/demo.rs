use crate::infra::{
    InMemoryApplicationRepository, InMemoryDocumentStore, LoggingMailer, SimulatedPaymentGateway,
};
use chrono::Utc;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

use greenland_leasing::config::{EmailConfig, PaymentConfig};
use greenland_leasing::error::AppError;
use greenland_leasing::workflows::application::{
    poll_verification, sign_payload, ApplicationRepository, ApplicationService, CancelToken,
    Certifications,
    EmergencyContact, FeeSchedule, FormState, Occupant, Pet, PetKind, PollOutcome, PollPolicy,
    ResidenceHistory, WebhookOutcome,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Number of adults on the application, primary applicant included.
    #[arg(long, default_value_t = 1)]
    pub(crate) adults: u32,
    /// Number of declared pets (0-5).
    #[arg(long, default_value_t = 0)]
    pub(crate) pets: u8,
    /// Confirm through the client polling fallback instead of the webhook.
    #[arg(long)]
    pub(crate) skip_webhook: bool,
    /// Leave the checkout session unpaid and show the polling loop give up.
    #[arg(long)]
    pub(crate) abandon_checkout: bool,
}

#[derive(Args, Debug)]
pub(crate) struct FeeQuoteArgs {
    /// Number of adults on the application, primary applicant included.
    #[arg(long)]
    pub(crate) adults: u32,
    /// Number of declared pets.
    #[arg(long)]
    pub(crate) pets: u32,
}

pub(crate) fn run_fee_quote(args: FeeQuoteArgs) -> Result<(), AppError> {
    let quote = FeeSchedule::default().quote(args.adults, args.pets);
    println!("Application fee quote");
    println!(
        "- {} adult(s) x ${:.2} = ${:.2}",
        quote.adult_count,
        f64::from(FeeSchedule::default().adult_fee_cents) / 100.0,
        quote.adults_fee
    );
    println!(
        "- {} pet(s) x ${:.2} = ${:.2}",
        quote.pet_count,
        f64::from(FeeSchedule::default().pet_fee_cents) / 100.0,
        quote.pets_fee
    );
    println!("- Total: ${:.2} ({} cents)", quote.total_fee, quote.total_fee_cents);
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        adults,
        pets,
        skip_webhook,
        abandon_checkout,
    } = args;

    let webhook_secret = "whsec_demo_local".to_string();
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let gateway = Arc::new(SimulatedPaymentGateway::default());
    let mailer = Arc::new(LoggingMailer::default());
    let documents = Arc::new(InMemoryDocumentStore::default());
    let service = Arc::new(ApplicationService::new(
        repository.clone(),
        gateway.clone(),
        mailer.clone(),
        documents,
        FeeSchedule::default(),
        PaymentConfig {
            secret_key: "sk_demo_local".to_string(),
            webhook_secret: webhook_secret.clone(),
            redirect_base_url: "https://www.mygreenlandapartments.com".to_string(),
        },
        EmailConfig {
            api_key: "re_demo_local".to_string(),
            from_address: "Greenland Apartments <applications@mygreenlandapartments.com>"
                .to_string(),
        },
    ));

    println!("Application pipeline demo");
    let quote = service.quote(adults.max(1), u32::from(pets));
    println!(
        "- Fee preview: {} adult(s) + {} pet(s) = ${:.2}",
        quote.adult_count, quote.pet_count, quote.total_fee
    );

    let form = demo_form(adults.max(1), pets);
    let receipt = match service.submit(&form) {
        Ok(receipt) => receipt,
        Err(err) => {
            println!("  Submission rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- Submitted application {} -> confirmation {}",
        receipt.application_id, receipt.confirmation_code
    );
    println!("  Checkout redirect: {}", receipt.redirect_url);

    let session = match repository
        .fetch(&receipt.application_id)
        .ok()
        .flatten()
        .and_then(|record| record.checkout_session)
    {
        Some(session) => session,
        None => {
            println!("  No checkout session stored; demo cannot continue");
            return Ok(());
        }
    };

    if abandon_checkout {
        println!("- Applicant abandons checkout; polling until the attempts run out");
        let policy = PollPolicy {
            interval: Duration::from_millis(250),
            max_attempts: 4,
        };
        let poll_service = Arc::clone(&service);
        let id = receipt.application_id.clone();
        let outcome = poll_verification(policy, &CancelToken::new(), move |_| {
            let report = poll_service.verify_payment(&id);
            async move { report }
        })
        .await;
        println!("  Polling outcome: {outcome:?}");
        return Ok(());
    }

    println!("- Applicant completes the hosted checkout");
    gateway.complete_checkout(&session);

    if skip_webhook {
        println!("- Webhook suppressed; the client polling fallback confirms instead");
        let policy = PollPolicy {
            interval: Duration::from_millis(250),
            max_attempts: 12,
        };
        let poll_service = Arc::clone(&service);
        let id = receipt.application_id.clone();
        let outcome = poll_verification(policy, &CancelToken::new(), move |_| {
            let report = poll_service.verify_payment(&id);
            async move { report }
        })
        .await;
        match outcome {
            PollOutcome::Verified(report) => {
                println!("  Verified for {}", report.applicant_name.unwrap_or_default());
            }
            other => {
                println!("  Polling outcome: {other:?}");
                return Ok(());
            }
        }
    } else {
        let body = serde_json::json!({
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": session.0,
                "status": "complete",
                "payment_status": "paid",
            }},
        })
        .to_string()
        .into_bytes();
        let header = sign_payload(&body, &webhook_secret, Utc::now().timestamp());
        match service.handle_webhook(&body, &header) {
            Ok(WebhookOutcome::Processed { application_id }) => {
                println!("- Webhook processed for {application_id}");
            }
            Ok(other) => println!("- Webhook outcome: {other:?}"),
            Err(err) => {
                println!("  Webhook rejected: {err}");
                return Ok(());
            }
        }
    }

    match repository.fetch(&receipt.application_id) {
        Ok(Some(record)) => match serde_json::to_string_pretty(&record.status_view()) {
            Ok(json) => println!("  Public status payload:\n{json}"),
            Err(err) => println!("  Public status payload unavailable: {err}"),
        },
        Ok(None) => println!("  Repository lookup returned no record"),
        Err(err) => println!("  Repository unavailable: {err}"),
    }

    let sent = mailer.sent();
    if sent.is_empty() {
        println!("  Confirmation emails: none captured");
    } else {
        println!("  Confirmation emails:");
        for message in sent {
            println!("    - to {} | {}", message.to, message.subject);
        }
    }

    Ok(())
}

fn demo_form(adults: u32, pets: u8) -> FormState {
    let mut form = FormState::default();
    form.first_name = "Avery".to_string();
    form.last_name = "Whitfield".to_string();
    form.date_of_birth = "1993-07-12".to_string();
    form.phone = "503-555-0190".to_string();
    form.email = "avery.whitfield@example.test".to_string();
    form.is_us_citizen = Some(true);
    form.ssn = "123-45-6789".to_string();
    form.current_residence = ResidenceHistory {
        address: "2200 NE Alberta St".to_string(),
        city: "Portland".to_string(),
        state: "OR".to_string(),
        zip: "97211".to_string(),
        date_moved_in: "2020-05-01".to_string(),
        date_moved_out: String::new(),
        monthly_rent: "1500".to_string(),
        reason_leaving: "Relocating closer to campus".to_string(),
        landlord_name: "T. Alvarez".to_string(),
        landlord_phone: "503-555-0171".to_string(),
        landlord_email: "t.alvarez@example.test".to_string(),
    };
    form.employment.status = "employed".to_string();
    form.emergency_contact = EmergencyContact {
        first_name: "Rowan".to_string(),
        last_name: "Whitfield".to_string(),
        relationship: "parent".to_string(),
        phone: "503-555-0192".to_string(),
        email: String::new(),
        has_unit_access: false,
    };
    form.certifications = Certifications {
        true_info: true,
        verify_info: true,
        background_check: true,
        false_info_denial: true,
        non_refundable_fee: true,
        terms: true,
    };

    for index in 1..adults {
        form.additional_occupants.push(Occupant {
            first_name: format!("Occupant{index}"),
            last_name: "Whitfield".to_string(),
            date_of_birth: "1995-01-01".to_string(),
            relationship: "roommate".to_string(),
            will_live_in_unit: true,
        });
    }

    if pets > 0 {
        form.has_pets = true;
        form.pets_count = pets.min(5);
        form.pets = (0..form.pets_count)
            .map(|i| Pet {
                kind: if i % 2 == 0 { PetKind::Cat } else { PetKind::Dog },
                other_description: None,
            })
            .collect();
    }

    form
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_runs_the_webhook_path_to_completion() {
        let args = DemoArgs {
            adults: 2,
            pets: 1,
            skip_webhook: false,
            abandon_checkout: false,
        };
        run_demo(args).await.expect("demo pipeline");
    }

    #[tokio::test]
    async fn demo_reports_an_abandoned_checkout_without_failing() {
        let args = DemoArgs {
            adults: 1,
            pets: 0,
            skip_webhook: false,
            abandon_checkout: true,
        };
        run_demo(args).await.expect("abandoned checkout demo");
    }
}
