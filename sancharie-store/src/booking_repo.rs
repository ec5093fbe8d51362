use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use sancharie_core::booking::{Booking, BookingStatus, NewBooking, PassengerRecord, PaymentStatus};
use sancharie_core::repository::{BookingRepository, RepositoryError};
use sancharie_seating::{Amount, StopPoint};
use sancharie_shared::PhoneNumber;

use crate::database::map_sqlx;

const BOOKING_COLUMNS: &str = "id, booking_reference, user_id, user_phone, bus_name, bus_type, source, \
    destination, journey_date, departure_time, arrival_time, boarding_point, dropping_point, seats, \
    passengers, search_token, external_booking_id, ticket_no, pnr, base_fare, service_tax, total_fare, \
    payment_id, payment_status, payment_method, status, cancellation_reason, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    booking_reference: String,
    user_id: Uuid,
    user_phone: String,
    bus_name: String,
    bus_type: String,
    source: String,
    destination: String,
    journey_date: NaiveDate,
    departure_time: Option<String>,
    arrival_time: Option<String>,
    boarding_point: Option<Json<StopPoint>>,
    dropping_point: Option<Json<StopPoint>>,
    seats: Json<Vec<String>>,
    passengers: Json<Vec<PassengerRecord>>,
    search_token: Option<String>,
    external_booking_id: Option<String>,
    ticket_no: Option<String>,
    pnr: Option<String>,
    base_fare: i64,
    service_tax: i64,
    total_fare: i64,
    payment_id: Option<String>,
    payment_status: String,
    payment_method: Option<String>,
    status: String,
    cancellation_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = RepositoryError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| RepositoryError::Backend(format!("booking {} has invalid {}", row.id, what));
        let user_phone = PhoneNumber::parse(&row.user_phone).map_err(|_| corrupt("user_phone"))?;
        let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| corrupt("payment_status"))?;
        let status = BookingStatus::parse(&row.status).ok_or_else(|| corrupt("status"))?;

        Ok(Booking {
            id: row.id,
            booking_reference: row.booking_reference,
            details: NewBooking {
                user_id: row.user_id,
                user_phone,
                bus_name: row.bus_name,
                bus_type: row.bus_type,
                source: row.source,
                destination: row.destination,
                journey_date: row.journey_date,
                departure_time: row.departure_time,
                arrival_time: row.arrival_time,
                boarding_point: row.boarding_point.map(|p| p.0),
                dropping_point: row.dropping_point.map(|p| p.0),
                seats: row.seats.0,
                passengers: row.passengers.0,
                search_token: row.search_token,
                external_booking_id: row.external_booking_id,
                ticket_no: row.ticket_no,
                pnr: row.pnr,
                base_fare: Amount::from_minor(row.base_fare),
                service_tax: Amount::from_minor(row.service_tax),
                total_fare: Amount::from_minor(row.total_fare),
                payment_id: row.payment_id,
                payment_status,
                payment_method: row.payment_method,
                status,
            },
            cancellation_reason: row.cancellation_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create(&self, booking: NewBooking) -> Result<Booking, RepositoryError> {
        let booking = Booking::from_new(booking);
        let d = &booking.details;
        sqlx::query(
            r#"
            INSERT INTO bookings (id, booking_reference, user_id, user_phone, bus_name, bus_type, source,
                destination, journey_date, departure_time, arrival_time, boarding_point, dropping_point,
                seats, passengers, search_token, external_booking_id, ticket_no, pnr, base_fare,
                service_tax, total_fare, payment_id, payment_status, payment_method, status,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
                $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.booking_reference)
        .bind(d.user_id)
        .bind(d.user_phone.as_str())
        .bind(&d.bus_name)
        .bind(&d.bus_type)
        .bind(&d.source)
        .bind(&d.destination)
        .bind(d.journey_date)
        .bind(&d.departure_time)
        .bind(&d.arrival_time)
        .bind(d.boarding_point.as_ref().map(Json))
        .bind(d.dropping_point.as_ref().map(Json))
        .bind(Json(&d.seats))
        .bind(Json(&d.passengers))
        .bind(&d.search_token)
        .bind(&d.external_booking_id)
        .bind(&d.ticket_no)
        .bind(&d.pnr)
        .bind(d.base_fare.minor())
        .bind(d.service_tax.minor())
        .bind(d.total_fare.minor())
        .bind(&d.payment_id)
        .bind(d.payment_status.as_str())
        .bind(&d.payment_method)
        .bind(d.status.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(booking)
    }

    async fn list_for_user(&self, user_id: Uuid, limit: usize) -> Result<Vec<Booking>, RepositoryError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn get_for_user(&self, user_id: Uuid, id: Uuid) -> Result<Option<Booking>, RepositoryError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE id = $1 AND user_id = $2",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(Booking::try_from).transpose()
    }

    async fn mark_cancelled(&self, id: Uuid, reason: &str) -> Result<Booking, RepositoryError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "UPDATE bookings SET status = 'cancelled', cancellation_reason = $2, updated_at = NOW()
             WHERE id = $1 AND status IN ('pending', 'confirmed') RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match row {
            Some(row) => Booking::try_from(row),
            None => {
                let exists: Option<(String,)> = sqlx::query_as("SELECT status FROM bookings WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx)?;
                match exists {
                    Some((status,)) => Err(RepositoryError::Conflict(format!("booking is already {}", status))),
                    None => Err(RepositoryError::NotFound("Booking")),
                }
            }
        }
    }
}
