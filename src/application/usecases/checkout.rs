use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    application::interfaces::payment_gateway::{CheckoutSessionRequest, PaymentGateway},
    domain::{
        entities::courses::CourseEntity,
        repositories::{
            courses::CourseRepository, enrollments::EnrollmentRepository,
            payments::PaymentRepository, subscriptions::SubscriptionRepository,
        },
        value_objects::{
            enums::subscription_plans::SubscriptionPlan,
            payments::{CheckoutResponseDto, PaymentKind, PendingPaymentModel},
        },
    },
};

pub const SUCCESS_PATH: &str = "/api/v1/payments/success";
pub const CANCEL_PATH: &str = "/api/v1/payments/cancel";

pub fn course_checkout_path(course_id: Uuid) -> String {
    format!("/api/v1/payments/courses/{course_id}/checkout")
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("course not found")]
    CourseNotFound,
    #[error("unknown subscription plan: {0}")]
    UnknownPlan(String),
    #[error("course is free, enroll directly")]
    FreeCourse,
    #[error("already enrolled in this course")]
    AlreadyEnrolled,
    #[error("an active subscription already exists")]
    AlreadySubscribed,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CheckoutError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            CheckoutError::CourseNotFound => StatusCode::NOT_FOUND,
            CheckoutError::UnknownPlan(_) | CheckoutError::FreeCourse => StatusCode::BAD_REQUEST,
            CheckoutError::AlreadyEnrolled | CheckoutError::AlreadySubscribed => {
                StatusCode::CONFLICT
            }
            CheckoutError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, CheckoutError>;

/// Where the processor sends the buyer back, and the currency plans are sold in.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub public_base_url: Url,
    pub currency: String,
}

impl CheckoutSettings {
    fn absolute(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// `{CHECKOUT_SESSION_ID}` is substituted by the processor and must stay unencoded.
    pub fn success_url(&self) -> String {
        format!(
            "{}?session_id={{CHECKOUT_SESSION_ID}}",
            self.absolute(SUCCESS_PATH)
        )
    }

    pub fn course_cancel_url(&self, slug: &str) -> String {
        self.absolute(&format!("/api/v1/courses/{slug}"))
    }

    pub fn cancel_url(&self) -> String {
        self.absolute(CANCEL_PATH)
    }
}

pub struct CheckoutUseCase<C, E, S, P, G>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    course_repo: Arc<C>,
    enrollment_repo: Arc<E>,
    subscription_repo: Arc<S>,
    payment_repo: Arc<P>,
    payment_gateway: Arc<G>,
    settings: CheckoutSettings,
}

impl<C, E, S, P, G> CheckoutUseCase<C, E, S, P, G>
where
    C: CourseRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    pub fn new(
        course_repo: Arc<C>,
        enrollment_repo: Arc<E>,
        subscription_repo: Arc<S>,
        payment_repo: Arc<P>,
        payment_gateway: Arc<G>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            course_repo,
            enrollment_repo,
            subscription_repo,
            payment_repo,
            payment_gateway,
            settings,
        }
    }

    pub async fn course_checkout(
        &self,
        user_id: Uuid,
        user_email: String,
        course_id: Uuid,
    ) -> UseCaseResult<CheckoutResponseDto> {
        info!(%user_id, %course_id, "checkout: course checkout requested");

        let course = self
            .course_repo
            .find_active_by_id(course_id)
            .await
            .map_err(|err| {
                error!(%course_id, db_error = ?err, "checkout: failed to load course");
                CheckoutError::Internal(err)
            })?
            .ok_or(CheckoutError::CourseNotFound)?;

        if course.is_free() {
            warn!(%user_id, %course_id, "checkout: refusing checkout for free course");
            return Err(CheckoutError::FreeCourse);
        }

        let existing = self
            .enrollment_repo
            .find_active(user_id, course_id)
            .await
            .map_err(|err| {
                error!(%user_id, %course_id, db_error = ?err, "checkout: failed to load enrollment");
                CheckoutError::Internal(err)
            })?;
        if existing.is_some() {
            info!(%user_id, %course_id, "checkout: user already enrolled");
            return Err(CheckoutError::AlreadyEnrolled);
        }

        let request = self.course_session_request(&course, user_id, user_email);
        let pending = |session_id: String| PendingPaymentModel {
            user_id,
            amount_minor: course.price_minor,
            currency: course.currency.to_lowercase(),
            kind: PaymentKind::Course { course_id },
            provider_session_id: session_id,
        };

        self.open_session(request, pending).await
    }

    pub async fn subscription_checkout(
        &self,
        user_id: Uuid,
        user_email: String,
        plan: String,
    ) -> UseCaseResult<CheckoutResponseDto> {
        info!(%user_id, %plan, "checkout: subscription checkout requested");

        let plan = SubscriptionPlan::from_str(plan.trim())
            .ok_or_else(|| CheckoutError::UnknownPlan(plan.clone()))?;

        let active = self
            .subscription_repo
            .find_active(user_id, Utc::now())
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to load active subscription");
                CheckoutError::Internal(err)
            })?;
        if active.is_some() {
            info!(%user_id, "checkout: user already subscribed");
            return Err(CheckoutError::AlreadySubscribed);
        }

        let currency = self.settings.currency.to_lowercase();
        let request = CheckoutSessionRequest {
            customer_email: user_email,
            product_name: plan.display_name().to_string(),
            amount_minor: plan.price_minor(),
            currency: currency.clone(),
            success_url: self.settings.success_url(),
            cancel_url: self.settings.cancel_url(),
            metadata: HashMap::from([
                ("plan".to_string(), plan.as_str().to_string()),
                ("user_id".to_string(), user_id.to_string()),
                ("payment_type".to_string(), "subscription".to_string()),
            ]),
        };
        let pending = |session_id: String| PendingPaymentModel {
            user_id,
            amount_minor: plan.price_minor(),
            currency: currency.clone(),
            kind: PaymentKind::Subscription {
                plan,
                subscription_id: None,
            },
            provider_session_id: session_id,
        };

        self.open_session(request, pending).await
    }

    fn course_session_request(
        &self,
        course: &CourseEntity,
        user_id: Uuid,
        user_email: String,
    ) -> CheckoutSessionRequest {
        CheckoutSessionRequest {
            customer_email: user_email,
            product_name: course.title.clone(),
            amount_minor: course.price_minor,
            currency: course.currency.to_lowercase(),
            success_url: self.settings.success_url(),
            cancel_url: self.settings.course_cancel_url(&course.slug),
            metadata: HashMap::from([
                ("course_id".to_string(), course.id.to_string()),
                ("user_id".to_string(), user_id.to_string()),
                ("payment_type".to_string(), "course".to_string()),
            ]),
        }
    }

    /// The pending payment is only written once the processor accepted the session.
    async fn open_session<F>(
        &self,
        request: CheckoutSessionRequest,
        pending: F,
    ) -> UseCaseResult<CheckoutResponseDto>
    where
        F: FnOnce(String) -> PendingPaymentModel,
    {
        let session = self
            .payment_gateway
            .create_checkout_session(request)
            .await
            .map_err(|err| {
                error!(stripe_error = ?err, "checkout: failed to create checkout session");
                CheckoutError::Internal(err)
            })?;

        let pending = pending(session.session_id.clone());
        let payment = self
            .payment_repo
            .create_pending(pending.to_entity())
            .await
            .map_err(|err| {
                error!(
                    session_id = %session.session_id,
                    db_error = ?err,
                    "checkout: failed to record pending payment"
                );
                CheckoutError::Internal(err)
            })?;

        info!(
            payment_id = %payment.id,
            session_id = %session.session_id,
            user_id = %payment.user_id,
            amount_minor = payment.amount_minor,
            "checkout: pending payment recorded"
        );

        Ok(CheckoutResponseDto {
            session_id: session.session_id,
            checkout_url: session.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::interfaces::payment_gateway::{CreatedCheckoutSession, MockPaymentGateway},
        domain::{
            entities::{
                enrollments::EnrollmentEntity, payments::PaymentEntity,
                subscriptions::SubscriptionEntity,
            },
            repositories::{
                courses::MockCourseRepository, enrollments::MockEnrollmentRepository,
                payments::MockPaymentRepository, subscriptions::MockSubscriptionRepository,
            },
        },
    };
    use anyhow::anyhow;
    use chrono::Duration;
    use mockall::predicate::eq;

    fn settings() -> CheckoutSettings {
        CheckoutSettings {
            public_base_url: Url::parse("https://academy.example.com/").unwrap(),
            currency: "USD".to_string(),
        }
    }

    fn course(price_minor: i32) -> CourseEntity {
        let now = Utc::now();
        CourseEntity {
            id: Uuid::new_v4(),
            title: "Network Forensics".to_string(),
            slug: "network-forensics".to_string(),
            description: "Packets".to_string(),
            category: "forensics".to_string(),
            level: "intermediate".to_string(),
            price_minor,
            currency: "usd".to_string(),
            duration_hours: 12,
            thumbnail_url: None,
            trailer_url: None,
            prerequisites: None,
            learning_outcomes: None,
            instructor_name: None,
            is_active: true,
            is_premium: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn payment_row(insert: crate::domain::entities::payments::InsertPaymentEntity) -> PaymentEntity {
        PaymentEntity {
            id: Uuid::new_v4(),
            user_id: insert.user_id,
            amount_minor: insert.amount_minor,
            currency: insert.currency,
            status: insert.status,
            payment_type: insert.payment_type,
            course_id: insert.course_id,
            plan: insert.plan,
            subscription_id: None,
            provider_payment_id: None,
            provider_session_id: insert.provider_session_id,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    struct Mocks {
        courses: MockCourseRepository,
        enrollments: MockEnrollmentRepository,
        subscriptions: MockSubscriptionRepository,
        payments: MockPaymentRepository,
        gateway: MockPaymentGateway,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                courses: MockCourseRepository::new(),
                enrollments: MockEnrollmentRepository::new(),
                subscriptions: MockSubscriptionRepository::new(),
                payments: MockPaymentRepository::new(),
                gateway: MockPaymentGateway::new(),
            }
        }

        fn usecase(
            self,
        ) -> CheckoutUseCase<
            MockCourseRepository,
            MockEnrollmentRepository,
            MockSubscriptionRepository,
            MockPaymentRepository,
            MockPaymentGateway,
        > {
            CheckoutUseCase::new(
                Arc::new(self.courses),
                Arc::new(self.enrollments),
                Arc::new(self.subscriptions),
                Arc::new(self.payments),
                Arc::new(self.gateway),
                settings(),
            )
        }
    }

    #[test]
    fn success_url_keeps_session_placeholder() {
        assert_eq!(
            settings().success_url(),
            "https://academy.example.com/api/v1/payments/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(
            settings().course_cancel_url("intro"),
            "https://academy.example.com/api/v1/courses/intro"
        );
    }

    #[tokio::test]
    async fn course_checkout_records_pending_payment() {
        let user_id = Uuid::new_v4();
        let course = course(4_999);
        let course_id = course.id;
        let mut mocks = Mocks::new();

        mocks
            .courses
            .expect_find_active_by_id()
            .with(eq(course_id))
            .returning(move |_| {
                let course = course.clone();
                Box::pin(async move { Ok(Some(course)) })
            });
        mocks
            .enrollments
            .expect_find_active()
            .with(eq(user_id), eq(course_id))
            .returning(|_, _| Box::pin(async { Ok(None) }));
        mocks
            .gateway
            .expect_create_checkout_session()
            .withf(move |request| {
                request.amount_minor == 4_999
                    && request.metadata.get("payment_type").map(String::as_str) == Some("course")
                    && request.metadata.get("course_id") == Some(&course_id.to_string())
                    && request.customer_email == "learner@example.com"
            })
            .returning(|_| {
                Box::pin(async {
                    Ok(CreatedCheckoutSession {
                        session_id: "cs_test_course".to_string(),
                        url: "https://checkout.stripe.com/c/pay/cs_test_course".to_string(),
                    })
                })
            });
        mocks
            .payments
            .expect_create_pending()
            .withf(move |insert| {
                insert.provider_session_id == "cs_test_course"
                    && insert.status == "pending"
                    && insert.payment_type == "course"
                    && insert.course_id == Some(course_id)
            })
            .times(1)
            .returning(|insert| {
                let row = payment_row(insert);
                Box::pin(async move { Ok(row) })
            });

        let response = mocks
            .usecase()
            .course_checkout(user_id, "learner@example.com".to_string(), course_id)
            .await
            .unwrap();

        assert_eq!(response.session_id, "cs_test_course");
        assert!(response.checkout_url.contains("cs_test_course"));
    }

    #[tokio::test]
    async fn enrolled_user_cannot_buy_course_again() {
        let user_id = Uuid::new_v4();
        let course = course(4_999);
        let course_id = course.id;
        let mut mocks = Mocks::new();

        mocks.courses.expect_find_active_by_id().returning(move |_| {
            let course = course.clone();
            Box::pin(async move { Ok(Some(course)) })
        });
        mocks.enrollments.expect_find_active().returning(move |user_id, course_id| {
            Box::pin(async move {
                Ok(Some(EnrollmentEntity {
                    id: Uuid::new_v4(),
                    user_id,
                    course_id,
                    enrolled_at: Utc::now(),
                    completed_at: None,
                    progress_percentage: 0.0,
                    is_active: true,
                }))
            })
        });
        mocks.gateway.expect_create_checkout_session().never();
        mocks.payments.expect_create_pending().never();

        let err = mocks
            .usecase()
            .course_checkout(user_id, "learner@example.com".to_string(), course_id)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::AlreadyEnrolled));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn processor_failure_records_no_payment() {
        let course = course(4_999);
        let course_id = course.id;
        let mut mocks = Mocks::new();

        mocks.courses.expect_find_active_by_id().returning(move |_| {
            let course = course.clone();
            Box::pin(async move { Ok(Some(course)) })
        });
        mocks
            .enrollments
            .expect_find_active()
            .returning(|_, _| Box::pin(async { Ok(None) }));
        mocks
            .gateway
            .expect_create_checkout_session()
            .returning(|_| Box::pin(async { Err(anyhow!("card network unavailable")) }));
        mocks.payments.expect_create_pending().never();

        let err = mocks
            .usecase()
            .course_checkout(Uuid::new_v4(), "learner@example.com".to_string(), course_id)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Internal(_)));
    }

    #[tokio::test]
    async fn unknown_course_is_not_found() {
        let mut mocks = Mocks::new();
        mocks
            .courses
            .expect_find_active_by_id()
            .returning(|_| Box::pin(async { Ok(None) }));

        let err = mocks
            .usecase()
            .course_checkout(Uuid::new_v4(), "learner@example.com".to_string(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::CourseNotFound));
    }

    #[tokio::test]
    async fn subscription_checkout_prices_plan() {
        let user_id = Uuid::new_v4();
        let mut mocks = Mocks::new();

        mocks
            .subscriptions
            .expect_find_active()
            .returning(|_, _| Box::pin(async { Ok(None) }));
        mocks
            .gateway
            .expect_create_checkout_session()
            .withf(|request| {
                request.amount_minor == 19_999
                    && request.currency == "usd"
                    && request.metadata.get("plan").map(String::as_str) == Some("premium")
            })
            .returning(|_| {
                Box::pin(async {
                    Ok(CreatedCheckoutSession {
                        session_id: "cs_test_plan".to_string(),
                        url: "https://checkout.stripe.com/c/pay/cs_test_plan".to_string(),
                    })
                })
            });
        mocks
            .payments
            .expect_create_pending()
            .withf(|insert| {
                insert.plan.as_deref() == Some("premium")
                    && insert.payment_type == "subscription"
                    && insert.course_id.is_none()
            })
            .returning(|insert| {
                let row = payment_row(insert);
                Box::pin(async move { Ok(row) })
            });

        let response = mocks
            .usecase()
            .subscription_checkout(user_id, "learner@example.com".to_string(), "premium".to_string())
            .await
            .unwrap();

        assert_eq!(response.session_id, "cs_test_plan");
    }

    #[tokio::test]
    async fn unknown_plan_is_a_validation_error() {
        let mut mocks = Mocks::new();
        mocks.subscriptions.expect_find_active().never();
        mocks.gateway.expect_create_checkout_session().never();

        let err = mocks
            .usecase()
            .subscription_checkout(Uuid::new_v4(), "learner@example.com".to_string(), "gold".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::UnknownPlan(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn active_subscriber_cannot_subscribe_again() {
        let user_id = Uuid::new_v4();
        let mut mocks = Mocks::new();

        mocks.subscriptions.expect_find_active().returning(move |user_id, now| {
            Box::pin(async move {
                Ok(Some(SubscriptionEntity {
                    id: Uuid::new_v4(),
                    user_id,
                    plan: "basic".to_string(),
                    status: "active".to_string(),
                    starts_at: now - Duration::days(1),
                    ends_at: now + Duration::days(29),
                    provider_subscription_id: None,
                    created_at: now - Duration::days(1),
                }))
            })
        });
        mocks.gateway.expect_create_checkout_session().never();

        let err = mocks
            .usecase()
            .subscription_checkout(user_id, "learner@example.com".to_string(), "basic".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::AlreadySubscribed));
    }
}
