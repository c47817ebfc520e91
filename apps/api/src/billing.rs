//! Pricing catalogue and Stripe Checkout sessions.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::middleware::AuthUser;
use crate::errors::AppError;
use crate::state::AppState;

const STRIPE_CHECKOUT_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: &'static str,
    pub name: &'static str,
    /// US cents per month.
    pub monthly_price_cents: u32,
    pub features: &'static [&'static str],
}

pub const PLANS: &[Plan] = &[
    Plan {
        id: "free",
        name: "Free",
        monthly_price_cents: 0,
        features: &[
            "Unlimited job search",
            "Save up to 20 jobs",
            "Application tracker",
        ],
    },
    Plan {
        id: "pro",
        name: "Pro",
        monthly_price_cents: 1_900,
        features: &[
            "Everything in Free",
            "Personalized job recommendations",
            "Unlimited saved jobs",
            "Resume skill extraction",
            "Email alerts",
        ],
    },
    Plan {
        id: "enterprise",
        name: "Enterprise",
        monthly_price_cents: 9_900,
        features: &[
            "Everything in Pro",
            "Company profile management",
            "Featured job postings",
            "Priority support",
        ],
    },
];

pub fn find_plan(id: &str) -> Option<&'static Plan> {
    PLANS.iter().find(|p| p.id.eq_ignore_ascii_case(id.trim()))
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub plan: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: Option<String>,
}

/// Form fields for a subscription-mode Checkout session.
fn checkout_form(
    price_id: &str,
    plan: &Plan,
    user: &AuthUser,
    frontend_url: &str,
) -> Vec<(&'static str, String)> {
    let base = frontend_url.trim_end_matches('/');
    vec![
        ("mode", "subscription".to_string()),
        ("line_items[0][price]", price_id.to_string()),
        ("line_items[0][quantity]", "1".to_string()),
        ("customer_email", user.email.clone()),
        ("client_reference_id", user.user_id.to_string()),
        ("metadata[plan]", plan.id.to_string()),
        (
            "success_url",
            format!("{base}/billing/success?session_id={{CHECKOUT_SESSION_ID}}"),
        ),
        ("cancel_url", format!("{base}/pricing")),
    ]
}

/// GET /api/v1/pricing/plans
pub async fn handle_list_plans() -> Json<&'static [Plan]> {
    Json(PLANS)
}

/// POST /api/v1/billing/checkout
pub async fn handle_checkout(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let plan = find_plan(&req.plan)
        .ok_or_else(|| AppError::Validation(format!("Unknown plan '{}'", req.plan.trim())))?;
    if plan.monthly_price_cents == 0 {
        return Err(AppError::Validation(format!(
            "Plan '{}' does not require checkout",
            plan.id
        )));
    }

    let secret = state
        .config
        .stripe_secret_key
        .as_deref()
        .ok_or_else(|| AppError::Unavailable("Payments are not configured".to_string()))?;
    let price_id = state
        .config
        .stripe_price_ids
        .get(plan.id)
        .ok_or_else(|| {
            AppError::Unavailable(format!("No Stripe price configured for plan '{}'", plan.id))
        })?;

    let form = checkout_form(price_id, plan, &auth, &state.config.frontend_url);
    let response = state
        .http
        .post(STRIPE_CHECKOUT_URL)
        .basic_auth(secret, None::<&str>)
        .form(&form)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("Stripe request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AppError::Upstream(format!("Stripe response unreadable: {e}")))?;
    if !status.is_success() {
        let message = stripe_error_message(&body);
        warn!(%status, plan = plan.id, "Stripe checkout failed: {message}");
        return Err(AppError::Upstream(format!("Stripe: {message}")));
    }

    let session: StripeSession = serde_json::from_str(&body)
        .map_err(|e| AppError::Upstream(format!("Stripe response malformed: {e}")))?;
    let url = session
        .url
        .ok_or_else(|| AppError::Upstream("Stripe session has no URL".to_string()))?;

    info!(user_id = %auth.user_id, plan = plan.id, session_id = %session.id, "Checkout session created");
    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url,
    }))
}

fn stripe_error_message(body: &str) -> String {
    serde_json::from_str::<StripeErrorBody>(body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| "unknown error".to_string())
}
